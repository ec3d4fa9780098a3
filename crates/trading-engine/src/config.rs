//! Engine settings: everything the orchestrator reads between ticks.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use trading_core::{error::TradingError, types::InstrumentSpec};
use trading_positions::PositionManagerConfig;
use trading_risk::RiskConfig;
use trading_strategies::{validate_strategies, ForcedSignalConfig, StrategyConfig};

/// Orchestrator-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Instruments evaluated each tick, in order
    pub instruments: Vec<InstrumentSpec>,
    /// Deadline for every collaborator call
    pub call_timeout_ms: u64,
    /// Comment attached to every submitted order
    pub order_comment: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            instruments: vec![InstrumentSpec::forex_major("EURUSD")],
            call_timeout_ms: 5_000,
            order_comment: "autotrader".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn instrument(&self, symbol: &str) -> Option<&InstrumentSpec> {
        self.instruments.iter().find(|i| i.symbol == symbol)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.instruments.is_empty() {
            return Err("engine.instruments must not be empty".into());
        }
        if self.call_timeout_ms == 0 {
            return Err("engine.call_timeout_ms must be positive".into());
        }
        let mut seen = std::collections::HashSet::new();
        for instrument in &self.instruments {
            instrument.validate()?;
            if !seen.insert(instrument.symbol.as_str()) {
                return Err(format!("duplicate instrument '{}'", instrument.symbol));
            }
        }
        Ok(())
    }
}

/// Complete runtime configuration of the orchestrator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineSettings {
    pub engine: EngineConfig,
    pub risk: RiskConfig,
    pub positions: PositionManagerConfig,
    pub strategies: Vec<StrategyConfig>,
    pub forced: ForcedSignalConfig,
}

impl EngineSettings {
    /// Check every section; any failure rejects the whole settings object.
    pub fn validate(&self) -> Result<(), TradingError> {
        let invalid = TradingError::ConfigurationInvalid;

        self.engine.validate().map_err(invalid)?;
        self.risk.validate().map_err(invalid)?;
        self.positions.validate().map_err(invalid)?;
        validate_strategies(&self.strategies).map_err(|e| invalid(e.to_string()))?;
        self.forced.validate().map_err(|e| invalid(e.to_string()))?;

        if self
            .strategies
            .iter()
            .any(|s| s.name == self.forced.strategy_name)
        {
            return Err(invalid(format!(
                "forced.strategy_name '{}' collides with a configured strategy",
                self.forced.strategy_name
            )));
        }
        Ok(())
    }
}
