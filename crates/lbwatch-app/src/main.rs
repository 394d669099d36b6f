//! lbwatch: leaderboard position monitor entry point.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

/// Leaderboard position monitor
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via LBWATCH_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Monitor a trader's open positions until stopped
    Watch {
        /// Identifier to monitor (overrides the config file)
        #[arg(short, long)]
        uid: Option<String>,
    },
    /// Normalize a pasted payload file and print the canonical positions
    Paste {
        /// Path to the pasted JSON document (API envelope, bare entry
        /// list, or DOM dump)
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize TLS crypto provider (must be before any WS connections)
    lbwatch_stream::init_crypto();

    let args = Args::parse();

    lbwatch_telemetry::init_logging()?;

    info!("Starting lbwatch v{}", env!("CARGO_PKG_VERSION"));

    // Determine config path: CLI arg > LBWATCH_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("LBWATCH_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");
    let config = lbwatch_app::AppConfig::load(&config_path)?;

    let app = lbwatch_app::Application::new(config)?;

    match args.command {
        Command::Watch { uid } => app.run_watch(uid).await?,
        Command::Paste { file } => app.run_paste(&file)?,
    }

    Ok(())
}
