use clap::Parser;
use log::{error, info};
use neon_client::network::{Client, ClientOptions};
use neon_client::stats::WinCounter;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Neon Tap terminal client", long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:3000")]
    server: String,

    /// Display name
    #[arg(short = 'n', long)]
    name: Option<String>,

    /// Start a new game after joining
    #[arg(long)]
    start: bool,

    /// Tap targets automatically
    #[arg(short = 'b', long)]
    bot: bool,

    /// Bot reaction time in milliseconds
    #[arg(long, default_value = "150")]
    reaction_ms: u64,

    /// Exit after the first game ends
    #[arg(long)]
    once: bool,

    /// File holding the lifetime win counter
    #[arg(long, default_value = "neon-tap-wins.bin")]
    stats_file: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let wins = WinCounter::load(&args.stats_file);
    info!("Starting client...");
    info!("Lifetime wins: {}", wins.total());
    if args.bot {
        info!("Bot mode, {}ms reaction", args.reaction_ms);
    }

    let options = ClientOptions {
        name: args.name,
        start: args.start,
        bot: args.bot,
        reaction: Duration::from_millis(args.reaction_ms),
        keyboard: !args.bot,
        once: args.once,
    };

    let mut client = Client::connect(&args.server, options, Some(wins)).await?;

    tokio::select! {
        result = client.run() => {
            if let Err(e) = result {
                error!("Client stopped with error: {}", e);
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, disconnecting...");
        }
    }

    Ok(())
}
