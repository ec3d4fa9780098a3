//! Signal generator trait.

use trading_core::{
    error::StrategyError,
    types::{HistoryRequirement, IndicatorSnapshot, Series, Side, Signal},
};

use crate::config::{StrategyConfig, StrategyKind, StrategyParams};

/// A rule-based strategy turning one snapshot into at most one signal.
///
/// Generators receive their parameters on every call, so a configuration reload
/// never needs to rebuild them. Memory kept between calls (grid anchors) is
/// private to the generator instance.
pub trait SignalGenerator: Send + Sync {
    /// Kind of parameters this generator accepts.
    fn kind(&self) -> StrategyKind;

    /// Series lengths that must be available before [`SignalGenerator::evaluate`].
    fn requirements(&self, config: &StrategyConfig)
        -> Result<Vec<HistoryRequirement>, StrategyError>;

    /// Evaluate the latest bar.
    fn evaluate(
        &mut self,
        snapshot: &IndicatorSnapshot,
        config: &StrategyConfig,
    ) -> Result<Option<Signal>, StrategyError>;

    /// Drop all memory.
    fn reset(&mut self) {}

    /// The last signal on `instrument` did not become an order.
    fn on_order_failed(&mut self, _instrument: &str) {}

    /// The strategy no longer holds positions on `instrument`.
    fn on_flat(&mut self, _instrument: &str) {}
}

/// Reject parameters of the wrong kind.
pub(crate) fn params_mismatch(config: &StrategyConfig) -> StrategyError {
    StrategyError::ParamsMismatch {
        strategy: config.name.clone(),
        received: config.params.kind().to_string(),
    }
}

/// Side of a price move; `None` when flat or unreadable.
pub(crate) fn last_move(snapshot: &IndicatorSnapshot) -> Option<Side> {
    let now = snapshot.value(Series::Close, 0)?;
    let prev = snapshot.value(Series::Close, 1)?;
    if now > prev {
        Some(Side::Buy)
    } else if now < prev {
        Some(Side::Sell)
    } else {
        None
    }
}

/// `atr[0] / mean(atr[1..=lookback])`, `None` when unreadable or the baseline is zero.
pub(crate) fn volatility_ratio(snapshot: &IndicatorSnapshot, lookback: usize) -> Option<f64> {
    let current = snapshot.value(Series::Atr, 0)?;
    let mut sum = 0.0;
    for i in 1..=lookback {
        sum += snapshot.value(Series::Atr, i)?;
    }
    let baseline = sum / lookback as f64;
    if baseline <= 0.0 {
        return None;
    }
    Some(current / baseline)
}

impl StrategyParams {
    pub(crate) fn breakout_ratio(&self) -> Option<f64> {
        match self {
            StrategyParams::VolatilityBreakout(p) => Some(p.breakout_ratio),
            StrategyParams::NewsEvent(p) => Some(p.breakout_ratio),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_volatility_ratio() {
        let snap = IndicatorSnapshot::new("EURUSD", Utc::now(), 0.0001)
            .with_series(Series::Atr, vec![0.0030, 0.0010, 0.0020]);
        let ratio = volatility_ratio(&snap, 2).unwrap();
        assert!((ratio - 2.0).abs() < 1e-9);
        assert!(volatility_ratio(&snap, 3).is_none());
    }

    #[test]
    fn test_last_move() {
        let snap = |close: Vec<f64>| {
            IndicatorSnapshot::new("EURUSD", Utc::now(), 0.0001).with_series(Series::Close, close)
        };
        assert_eq!(last_move(&snap(vec![1.2, 1.1])), Some(Side::Buy));
        assert_eq!(last_move(&snap(vec![1.0, 1.1])), Some(Side::Sell));
        assert_eq!(last_move(&snap(vec![1.1, 1.1])), None);
    }
}
