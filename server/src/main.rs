use clap::Parser;
use log::{error, info};
use neon_server::config::ServerConfig;
use neon_server::network::Server;

/// Parses command-line arguments, then runs the room server until it stops
/// or Ctrl+C is pressed.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let config = ServerConfig::parse();

    info!("Starting Neon Tap server...");
    info!(
        "{} rounds per game, {}ms respawn delay, up to {} players",
        config.max_rounds, config.respawn_delay_ms, config.max_clients
    );
    if let Some(seed) = config.seed {
        info!("Using fixed target seed {}", seed);
    }

    let server = Server::new(&config).await?;

    // Handle shutdown gracefully
    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server stopped with error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
