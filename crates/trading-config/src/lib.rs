//! Configuration loading, validation and hot reload.
//!
//! Sources, later ones winning:
//! 1. built-in defaults
//! 2. the TOML file given on the command line
//! 3. `AUTOTRADER__SECTION__KEY` environment variables

mod settings;
mod store;

pub use settings::{AppConfig, AppSettings, LoggingConfig, ReplaySettings};
pub use store::ConfigStore;

use config::{Config, Environment, File};
use std::path::Path;
use thiserror::Error;
use trading_core::error::TradingError;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Configuration invalid: {0}")]
    Invalid(String),
}

impl From<ConfigError> for TradingError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Invalid(reason) => TradingError::ConfigurationInvalid(reason),
            other => TradingError::ConfigurationInvalid(other.to_string()),
        }
    }
}

/// Load configuration from an optional file and the environment, then validate it.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(true));
    }
    let config = builder
        .add_source(
            Environment::with_prefix("AUTOTRADER")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let app: AppConfig = config.try_deserialize()?;
    app.validate()?;
    Ok(app)
}
