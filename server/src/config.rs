//! Command line configuration for the room server.

use crate::session::SessionConfig;
use crate::spawner::SpawnBounds;
use clap::Parser;
use neon_shared::{DEFAULT_MAX_ROUNDS, RESPAWN_DELAY_MS};
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Neon Tap game room server", long_about = None)]
pub struct ServerConfig {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    pub host: String,

    /// Server port to listen on
    #[arg(short, long, default_value_t = 3000)]
    pub port: u16,

    /// Rounds per game
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_ROUNDS)]
    pub max_rounds: u32,

    /// Pause between a hit and the next target, in milliseconds
    #[arg(long, default_value_t = RESPAWN_DELAY_MS)]
    pub respawn_delay_ms: u64,

    /// Maximum number of simultaneous connections
    #[arg(short = 'm', long, default_value_t = 64)]
    pub max_clients: usize,

    /// Seed for target placement (random if omitted)
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            max_rounds: DEFAULT_MAX_ROUNDS,
            respawn_delay_ms: RESPAWN_DELAY_MS,
            max_clients: 64,
            seed: None,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_rounds == 0 {
            return Err("max rounds must be at least 1".to_string());
        }
        if self.max_clients == 0 {
            return Err("max clients must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            max_rounds: self.max_rounds,
            respawn_delay: Duration::from_millis(self.respawn_delay_ms),
            bounds: SpawnBounds::default(),
            seed: self.seed,
        }
    }
}
