//! Extreme oscillator reversal.
//!
//! Buys when the fast RSI crosses below the oversold level (it was at or above the
//! level one bar ago), sells on the mirrored overbought cross. Edge triggering keeps
//! the strategy from re-firing while the oscillator sits beyond the threshold.

use trading_core::{
    error::StrategyError,
    types::{HistoryRequirement, IndicatorSnapshot, Series, Side, Signal},
};

use crate::config::{ExtremeReversalParams, StrategyConfig, StrategyKind, StrategyParams};
use crate::generator::{params_mismatch, SignalGenerator};

#[derive(Debug, Default)]
pub struct ExtremeReversal;

impl ExtremeReversal {
    pub fn new() -> Self {
        Self
    }

    fn params(config: &StrategyConfig) -> Result<&ExtremeReversalParams, StrategyError> {
        match &config.params {
            StrategyParams::ExtremeReversal(p) => Ok(p),
            _ => Err(params_mismatch(config)),
        }
    }
}

impl SignalGenerator for ExtremeReversal {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ExtremeReversal
    }

    fn requirements(
        &self,
        config: &StrategyConfig,
    ) -> Result<Vec<HistoryRequirement>, StrategyError> {
        Self::params(config)?;
        Ok(vec![Series::RsiFast.at_least(2)])
    }

    fn evaluate(
        &mut self,
        snapshot: &IndicatorSnapshot,
        config: &StrategyConfig,
    ) -> Result<Option<Signal>, StrategyError> {
        let p = Self::params(config)?;
        let (Some(current), Some(previous)) = (
            snapshot.value(Series::RsiFast, 0),
            snapshot.value(Series::RsiFast, 1),
        ) else {
            return Ok(None);
        };

        let (side, distance, level) = if previous >= p.oversold && current < p.oversold {
            (Side::Buy, p.oversold - current, p.oversold)
        } else if previous <= p.overbought && current > p.overbought {
            (Side::Sell, current - p.overbought, p.overbought)
        } else {
            return Ok(None);
        };

        let confidence = p.base_confidence + p.confidence_per_point * distance;
        Ok(Some(
            Signal::new(
                &config.name,
                &snapshot.instrument,
                side,
                confidence,
                snapshot.time,
            )
            .with_reason(format!(
                "fast RSI {previous:.1} -> {current:.1} crossed {level:.1}"
            )),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn config() -> StrategyConfig {
        StrategyConfig::new(
            "extreme",
            StrategyParams::ExtremeReversal(ExtremeReversalParams::default()),
        )
    }

    fn snapshot(rsi: Vec<f64>) -> IndicatorSnapshot {
        IndicatorSnapshot::new("EURUSD", Utc::now(), 0.0001).with_series(Series::RsiFast, rsi)
    }

    #[test]
    fn test_oversold_cross_buys_with_scaled_confidence() {
        let mut strategy = ExtremeReversal::new();
        let signal = strategy
            .evaluate(&snapshot(vec![7.0, 12.0]), &config())
            .unwrap()
            .unwrap();

        assert_eq!(signal.side, Side::Buy);
        assert!((signal.confidence - 96.0).abs() < 1e-9);
        assert_eq!(signal.strategy, "extreme");
    }

    #[test]
    fn test_is_edge_triggered() {
        let mut strategy = ExtremeReversal::new();
        // Already below the threshold last bar
        assert!(strategy
            .evaluate(&snapshot(vec![6.0, 7.0]), &config())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_overbought_cross_sells_and_clamps() {
        let mut strategy = ExtremeReversal::new();
        let signal = strategy
            .evaluate(&snapshot(vec![99.5, 85.0]), &config())
            .unwrap()
            .unwrap();

        assert_eq!(signal.side, Side::Sell);
        // 90 + 2 * 9.5 = 109 -> clamped
        assert_eq!(signal.confidence, 100.0);
    }

    #[test]
    fn test_wrong_params_rejected() {
        let mut strategy = ExtremeReversal::new();
        let mut cfg = config();
        cfg.params = StrategyKind::GridRecovery.default_params();
        assert!(matches!(
            strategy.evaluate(&snapshot(vec![7.0, 12.0]), &cfg),
            Err(StrategyError::ParamsMismatch { .. })
        ));
    }
}
