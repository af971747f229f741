//! # Neon Tap Room Server
//!
//! This library provides the authoritative server for the Neon Tap mini-game:
//! one shared room where every connected player races to tap targets that
//! the server spawns at random positions. Clients only render and forward
//! taps; every decision about rounds, scores and winners is made here.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Game State
//! The server owns membership, the round counter, the single live target and
//! every score. Clients conform to the state it broadcasts.
//!
//! ### Hit Arbitration
//! Several players may tap the same target at nearly the same instant. The
//! first hit the server processes claims the target and clears it; later
//! hits name a target that no longer exists and are ignored.
//!
//! ### State Broadcasting
//! Every state change is pushed to all connections as a single, fully formed
//! notification (`game:updatePlayers`, `game:spawn`, `game:end`).
//!
//! ## Architecture Design
//!
//! ### Single-Threaded Event Loop
//! Socket reader tasks and round timers never touch game state. They send
//! messages to one loop task that owns the [`session::Session`] and applies
//! each message to completion before taking the next. This linearizes every
//! operation without a lock.
//!
//! ### Deferred Round Advance
//! After a successful hit the next target appears after a short pause. The
//! pause is a timer task tagged with an epoch; restarting the game bumps the
//! epoch so a timer from the previous game is discarded when it fires.
//!
//! ## Module Organization
//!
//! - [`registry`]: participants, display names and scores
//! - [`spawner`]: random target placement
//! - [`session`]: the game state machine
//! - [`broadcast`]: live connection set and fan-out
//! - [`router`]: inbound frame validation and dispatch
//! - [`network`]: WebSocket transport and the event loop
//! - [`config`]: command line configuration
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use neon_server::config::ServerConfig;
//! use neon_server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig {
//!         port: 3000,
//!         ..ServerConfig::default()
//!     };
//!
//!     let server = Server::new(&config).await?;
//!     if let Err(e) = server.run().await {
//!         eprintln!("Server error: {}", e);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod config;
pub mod network;
pub mod registry;
pub mod router;
pub mod session;
pub mod spawner;
