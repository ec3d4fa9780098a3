//! Configuration structures.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use trading_data::SnapshotConfig;
use trading_engine::{EngineConfig, EngineSettings};
use trading_positions::PositionManagerConfig;
use trading_risk::RiskConfig;
use trading_strategies::{ForcedSignalConfig, StrategyConfig, StrategyKind};

use crate::ConfigError;

/// Main application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSettings,
    pub logging: LoggingConfig,
    pub engine: EngineConfig,
    pub risk: RiskConfig,
    pub positions: PositionManagerConfig,
    pub strategies: Vec<StrategyConfig>,
    pub forced: ForcedSignalConfig,
    pub replay: ReplaySettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSettings::default(),
            logging: LoggingConfig::default(),
            engine: EngineConfig::default(),
            risk: RiskConfig::default(),
            positions: PositionManagerConfig::default(),
            strategies: default_strategies(),
            forced: ForcedSignalConfig::default(),
            replay: ReplaySettings::default(),
        }
    }
}

impl AppConfig {
    /// Check every section. The first problem found is reported.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.logging.validate().map_err(ConfigError::Invalid)?;
        self.replay.validate().map_err(ConfigError::Invalid)?;
        self.engine_settings()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// The sections the orchestrator reads.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            engine: self.engine.clone(),
            risk: self.risk.clone(),
            positions: self.positions.clone(),
            strategies: self.strategies.clone(),
            forced: self.forced.clone(),
        }
    }
}

/// One instance of every built-in strategy, grid recovery disabled.
fn default_strategies() -> Vec<StrategyConfig> {
    StrategyKind::ALL
        .iter()
        .zip(1u32..)
        .map(|(kind, priority)| {
            let mut config = StrategyConfig::new(kind.as_str(), kind.default_params());
            config.priority = priority;
            config.enabled = *kind != StrategyKind::GridRecovery;
            config
        })
        .collect()
}

/// General app settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "autotrader".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format == "json"
    }

    fn validate(&self) -> Result<(), String> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.level.as_str()) {
            return Err(format!("logging.level '{}' is not one of {:?}", self.level, LEVELS));
        }
        if !matches!(self.format.as_str(), "pretty" | "json") {
            return Err(format!("logging.format '{}' must be pretty or json", self.format));
        }
        Ok(())
    }
}

/// Paper account and snapshot settings for the `replay` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplaySettings {
    pub initial_balance: Decimal,
    pub leverage: Decimal,
    /// Adverse fill offset, in pips
    pub slippage_pips: Decimal,
    /// Bars revealed before the first tick; defaults to the indicator warm-up
    pub warmup_bars: Option<usize>,
    pub snapshot: SnapshotConfig,
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self {
            initial_balance: dec!(10000),
            leverage: dec!(100),
            slippage_pips: Decimal::ZERO,
            warmup_bars: None,
            snapshot: SnapshotConfig::default(),
        }
    }
}

impl ReplaySettings {
    pub fn warmup(&self) -> usize {
        self.warmup_bars.unwrap_or_else(|| self.snapshot.warmup())
    }

    fn validate(&self) -> Result<(), String> {
        if self.initial_balance <= Decimal::ZERO {
            return Err("replay.initial_balance must be positive".into());
        }
        if self.leverage <= Decimal::ZERO {
            return Err("replay.leverage must be positive".into());
        }
        if self.slippage_pips < Decimal::ZERO {
            return Err("replay.slippage_pips must not be negative".into());
        }
        self.snapshot
            .validate()
            .map_err(|reason| format!("replay.snapshot: {reason}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.strategies.len(), 5);
        assert_eq!(config.strategies[0].name, "extreme_reversal");
        assert!(!config.strategies[4].enabled);
        assert_eq!(config.replay.warmup(), 50);
    }

    #[test]
    fn test_invalid_logging_level() {
        let mut config = AppConfig::default();
        config.logging.level = "loud".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(msg)) if msg.contains("logging.level")));
    }

    #[test]
    fn test_engine_section_errors_surface() {
        let mut config = AppConfig::default();
        config.risk.max_positions = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.strategies.push(config.strategies[0].clone());
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(msg)) if msg.contains("duplicate")));
    }

    #[test]
    fn test_replay_balance_must_be_positive() {
        let mut config = AppConfig::default();
        config.replay.initial_balance = Decimal::ZERO;
        assert!(config.validate().is_err());
    }
}
