//! Time-windowed high-impact event trading.

use trading_core::{
    error::StrategyError,
    types::{HistoryRequirement, IndicatorSnapshot, Series, Signal},
};

use crate::config::{NewsEventParams, StrategyConfig, StrategyKind, StrategyParams};
use crate::generator::{last_move, params_mismatch, volatility_ratio, SignalGenerator};

/// A stricter volatility breakout that only runs inside UTC event windows.
#[derive(Debug, Default)]
pub struct NewsEvent;

impl NewsEvent {
    pub fn new() -> Self {
        Self
    }

    fn params(config: &StrategyConfig) -> Result<&NewsEventParams, StrategyError> {
        match &config.params {
            StrategyParams::NewsEvent(p) => Ok(p),
            _ => Err(params_mismatch(config)),
        }
    }
}

impl SignalGenerator for NewsEvent {
    fn kind(&self) -> StrategyKind {
        StrategyKind::NewsEvent
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
        let time = snapshot.time.time();
        if !p.windows.iter().any(|w| w.contains(time)) {
            return Ok(None);
        }

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
                .with_reason(format!("event window spike {ratio:.2}x at {time}")),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimeWindow;
    use chrono::{NaiveTime, TimeZone, Utc};
    use trading_core::types::Side;

    fn config() -> StrategyConfig {
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        StrategyConfig::new(
            "news",
            StrategyParams::NewsEvent(NewsEventParams {
                windows: vec![TimeWindow::new(t(23, 30), t(0, 30))],
                lookback: 2,
                breakout_ratio: 2.0,
                base_confidence: 80.0,
                confidence_per_ratio: 10.0,
            }),
        )
    }

    fn snapshot_at(h: u32, m: u32) -> IndicatorSnapshot {
        let time = Utc.with_ymd_and_hms(2024, 3, 8, h, m, 0).unwrap();
        IndicatorSnapshot::new("EURUSD", time, 0.0001)
            .with_series(Series::Atr, vec![0.0030, 0.0010, 0.0010])
            .with_series(Series::Close, vec![1.1010, 1.1000])
    }

    #[test]
    fn test_fires_inside_wrapping_window() {
        let mut strategy = NewsEvent::new();
        let signal = strategy
            .evaluate(&snapshot_at(0, 10), &config())
            .unwrap()
            .unwrap();
        assert_eq!(signal.side, Side::Buy);
        assert!((signal.confidence - 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_silent_outside_window() {
        let mut strategy = NewsEvent::new();
        assert!(strategy
            .evaluate(&snapshot_at(12, 0), &config())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_requires_larger_ratio() {
        let mut strategy = NewsEvent::new();
        let snap = snapshot_at(23, 45).with_series(Series::Atr, vec![0.0018, 0.0010, 0.0010]);
        assert!(strategy.evaluate(&snap, &config()).unwrap().is_none());
    }
}
