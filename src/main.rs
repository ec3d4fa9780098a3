//! Trading engine CLI application.

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use trading_config::{load_config, LoggingConfig};
use trading_monitor::setup_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Flags win over the configured logging section
    let logging = load_config(cli.config.as_deref())
        .map(|config| config.logging)
        .unwrap_or_else(|_| LoggingConfig::default());
    let level = cli
        .log_level
        .map(|level| level.as_str().to_string())
        .unwrap_or(logging.level.clone());
    setup_logging(&level, cli.json_logs || logging.is_json())?;

    match cli.command {
        Commands::Replay(args) => cli::commands::replay::run(args, cli.config.as_deref()).await,
        Commands::Strategies => cli::commands::strategies::run().await,
        Commands::ValidateConfig => cli::commands::validate::run(cli.config.as_deref()).await,
    }
}
