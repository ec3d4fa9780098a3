//! Volatility-expansion breakout.

use trading_core::{
    error::StrategyError,
    types::{HistoryRequirement, IndicatorSnapshot, Series, Signal},
};

use crate::config::{StrategyConfig, StrategyKind, StrategyParams, VolatilityBreakoutParams};
use crate::generator::{last_move, params_mismatch, volatility_ratio, SignalGenerator};

/// Fires when ATR expands past a multiple of its trailing mean; trades the
/// direction of the last close-to-close move.
#[derive(Debug, Default)]
pub struct VolatilityBreakout;

impl VolatilityBreakout {
    pub fn new() -> Self {
        Self
    }

    fn params(config: &StrategyConfig) -> Result<&VolatilityBreakoutParams, StrategyError> {
        match &config.params {
            StrategyParams::VolatilityBreakout(p) => Ok(p),
            _ => Err(params_mismatch(config)),
        }
    }
}

impl SignalGenerator for VolatilityBreakout {
    fn kind(&self) -> StrategyKind {
        StrategyKind::VolatilityBreakout
    }

    fn requirements(
        &self,
        config: &StrategyConfig,
    ) -> Result<Vec<HistoryRequirement>, StrategyError> {
        let p = Self::params(config)?;
        Ok(vec![
            Series::Atr.at_least(p.lookback + 1),
            Series::Close.at_least(2),
        ])
    }

    fn evaluate(
        &mut self,
        snapshot: &IndicatorSnapshot,
        config: &StrategyConfig,
    ) -> Result<Option<Signal>, StrategyError> {
        let p = Self::params(config)?;
        let Some(ratio) = volatility_ratio(snapshot, p.lookback) else {
            return Ok(None);
        };
        if ratio <= p.breakout_ratio {
            return Ok(None);
        }
        let Some(side) = last_move(snapshot) else {
            return Ok(None);
        };

        let confidence = p.base_confidence + p.confidence_per_ratio * (ratio - p.breakout_ratio);
        Ok(Some(
            Signal::new(&config.name, &snapshot.instrument, side, confidence, snapshot.time)
                .with_reason(format!("ATR expansion {ratio:.2}x")),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use trading_core::types::Side;

    fn config() -> StrategyConfig {
        StrategyConfig::new(
            "breakout",
            StrategyParams::VolatilityBreakout(VolatilityBreakoutParams {
                lookback: 3,
                breakout_ratio: 1.5,
                base_confidence: 60.0,
                confidence_per_ratio: 20.0,
            }),
        )
    }

    fn snapshot(atr: Vec<f64>, close: Vec<f64>) -> IndicatorSnapshot {
        IndicatorSnapshot::new("EURUSD", Utc::now(), 0.0001)
            .with_series(Series::Atr, atr)
            .with_series(Series::Close, close)
    }

    #[test]
    fn test_expansion_follows_last_move() {
        let mut strategy = VolatilityBreakout::new();
        let snap = snapshot(vec![0.0020, 0.0010, 0.0010, 0.0010], vec![1.0950, 1.1000]);
        let signal = strategy.evaluate(&snap, &config()).unwrap().unwrap();

        assert_eq!(signal.side, Side::Sell);
        // ratio 2.0 -> 60 + 20 * 0.5
        assert!((signal.confidence - 70.0).abs() < 1e-6);
    }

    #[test]
    fn test_no_signal_below_ratio() {
        let mut strategy = VolatilityBreakout::new();
        let snap = snapshot(vec![0.0014, 0.0010, 0.0010, 0.0010], vec![1.1050, 1.1000]);
        assert!(strategy.evaluate(&snap, &config()).unwrap().is_none());
    }

    #[test]
    fn test_no_signal_on_flat_close() {
        let mut strategy = VolatilityBreakout::new();
        let snap = snapshot(vec![0.0030, 0.0010, 0.0010, 0.0010], vec![1.1000, 1.1000]);
        assert!(strategy.evaluate(&snap, &config()).unwrap().is_none());
    }

    #[test]
    fn test_requirements_follow_lookback() {
        let reqs = VolatilityBreakout::new().requirements(&config()).unwrap();
        assert!(reqs.contains(&Series::Atr.at_least(4)));
    }
}
