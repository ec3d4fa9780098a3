//! CLI definitions.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "autotrader")]
#[command(author, version, about = "Bar-driven trading decision engine")]
pub struct Cli {
    /// Configuration file path (TOML); defaults apply when omitted
    #[arg(short, long, env = "AUTOTRADER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level; overrides the configured level
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Drive the engine bar by bar over a CSV file against the paper broker
    Replay(ReplayArgs),
    /// List built-in strategies
    Strategies,
    /// Validate configuration
    ValidateConfig,
}

#[derive(clap::Args)]
pub struct ReplayArgs {
    /// Bar data file (CSV with date, open, high, low, close columns)
    #[arg(short, long)]
    pub data: PathBuf,

    /// Instrument the bars belong to
    #[arg(short, long)]
    pub instrument: String,

    /// Initial capital; overrides replay.initial_balance
    #[arg(long)]
    pub capital: Option<Decimal>,

    /// Re-read the configuration file every N bars
    #[arg(long)]
    pub reload_every: Option<usize>,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    pub output: String,
}
