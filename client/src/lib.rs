//! # Neon Tap Client Library
//!
//! A terminal client for the Neon Tap room server. It connects over
//! WebSocket, mirrors the state the server broadcasts, and taps targets
//! either from the keyboard or automatically as a bot.
//!
//! ## Architecture Overview
//!
//! The server is authoritative. The client never decides whether a tap
//! scored; it sends `game:hit` for the target it sees and waits for the next
//! `game:updatePlayers` and `game:spawn` to learn the outcome. A target is
//! removed locally as soon as it is tapped so it cannot be sent twice.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! Local mirror of the room:
//! - Our connection id from `session:welcome`
//! - Scoreboard ordered by score
//! - Current target and round
//! - Result of the last game
//!
//! ### Network Module (`network`)
//! WebSocket session with the server, join/start requests, bot reaction
//! timer and keyboard taps.
//!
//! ### Stats Module (`stats`)
//! Lifetime win counter kept in a small file between runs.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use neon_client::network::{Client, ClientOptions};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = ClientOptions {
//!         name: Some("Bot".to_string()),
//!         start: true,
//!         bot: true,
//!         reaction: Duration::from_millis(100),
//!         once: true,
//!         ..ClientOptions::default()
//!     };
//!
//!     let mut client = Client::connect("127.0.0.1:3000", options, None).await?;
//!     let result = client.run().await?;
//!     println!("{:?}", result);
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod network;
pub mod stats;
