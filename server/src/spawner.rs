//! Random target placement.

use log::debug;
use neon_shared::{Target, TARGET_X_RANGE, TARGET_Y_RANGE};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Builder;

/// Normalized area targets may appear in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnBounds {
    pub x: (f64, f64),
    pub y: (f64, f64),
}

impl Default for SpawnBounds {
    fn default() -> Self {
        Self {
            x: TARGET_X_RANGE,
            y: TARGET_Y_RANGE,
        }
    }
}

/// Produces targets from a single RNG. Ids come from the same RNG, so a
/// seeded spawner replays the exact same sequence.
pub struct TargetSpawner {
    rng: StdRng,
}

impl TargetSpawner {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn spawn(&mut self, bounds: &SpawnBounds) -> Target {
        let x = self.rng.gen_range(bounds.x.0..=bounds.x.1);
        let y = self.rng.gen_range(bounds.y.0..=bounds.y.1);
        let id = Builder::from_random_bytes(self.rng.gen::<[u8; 16]>())
            .into_uuid()
            .to_string();

        debug!("Spawned target {} at ({:.3}, {:.3})", id, x, y);
        Target { id, x, y }
    }
}

impl Default for TargetSpawner {
    fn default() -> Self {
        Self::new()
    }
}
