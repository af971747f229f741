//! Lifetime win counter persisted on disk.

use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Serialize, Deserialize)]
struct WinRecord {
    wins: u64,
}

/// Counts games this player has won, across sessions
#[derive(Debug)]
pub struct WinCounter {
    path: PathBuf,
    total: u64,
}

impl WinCounter {
    /// Opens the counter stored at `path`. A missing file starts at zero; an
    /// unreadable one is reset with a warning.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let total = match fs::read(&path) {
            Ok(bytes) => match bincode::deserialize::<WinRecord>(&bytes) {
                Ok(record) => record.wins,
                Err(e) => {
                    warn!("Ignoring corrupt win record {}: {}", path.display(), e);
                    0
                }
            },
            Err(_) => 0,
        };

        Self { path, total }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records one more win and writes it through
    pub fn increment(&mut self) -> Result<u64, Box<dyn std::error::Error>> {
        self.total += 1;
        self.save()?;
        Ok(self.total)
    }

    fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let bytes = bincode::serialize(&WinRecord { wins: self.total })?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir()
            .join(format!("neon-tap-test-{}-{}", name, nanos))
            .join("wins.bin")
    }

    #[test]
    fn test_missing_file_starts_at_zero() {
        let counter = WinCounter::load(temp_path("missing"));
        assert_eq!(counter.total(), 0);
    }

    #[test]
    fn test_increment_persists() {
        let path = temp_path("persist");

        let mut counter = WinCounter::load(&path);
        assert_eq!(counter.increment().unwrap(), 1);
        assert_eq!(counter.increment().unwrap(), 2);

        let reloaded = WinCounter::load(&path);
        assert_eq!(reloaded.total(), 2);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_corrupt_file_resets() {
        let path = temp_path("corrupt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, [1u8, 2]).unwrap();

        let counter = WinCounter::load(&path);
        assert_eq!(counter.total(), 0);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
