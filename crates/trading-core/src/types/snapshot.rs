//! Pre-computed indicator snapshot consumed once per bar.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DataError;

/// Identifies one series inside an [`IndicatorSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Series {
    Close,
    RsiFast,
    RsiSlow,
    EmaFast,
    EmaSlow,
    MacdMain,
    MacdSignal,
    Atr,
    BollingerUpper,
    BollingerMid,
    BollingerLower,
    Adx,
    HigherTimeframeEma,
}

impl Series {
    /// Build a minimum-length requirement for this series.
    pub fn at_least(self, length: usize) -> HistoryRequirement {
        HistoryRequirement {
            series: self,
            length,
        }
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Series::Close => "close",
            Series::RsiFast => "rsi_fast",
            Series::RsiSlow => "rsi_slow",
            Series::EmaFast => "ema_fast",
            Series::EmaSlow => "ema_slow",
            Series::MacdMain => "macd_main",
            Series::MacdSignal => "macd_signal",
            Series::Atr => "atr",
            Series::BollingerUpper => "bb_upper",
            Series::BollingerMid => "bb_mid",
            Series::BollingerLower => "bb_lower",
            Series::Adx => "adx",
            Series::HigherTimeframeEma => "htf_ema",
        };
        f.write_str(name)
    }
}

/// Minimum number of values a series must hold before a reader may use it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRequirement {
    pub series: Series,
    pub length: usize,
}

/// Indicator values for one instrument. Every series is ordered most-recent-first,
/// so index 0 is the bar that just closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub instrument: String,
    /// Open time of the most recent bar
    pub time: DateTime<Utc>,
    /// Price distance of one pip for the instrument
    pub pip_size: f64,
    pub close: Vec<f64>,
    pub rsi_fast: Vec<f64>,
    pub rsi_slow: Vec<f64>,
    pub ema_fast: Vec<f64>,
    pub ema_slow: Vec<f64>,
    pub macd_main: Vec<f64>,
    pub macd_signal: Vec<f64>,
    pub atr: Vec<f64>,
    pub bb_upper: Vec<f64>,
    pub bb_mid: Vec<f64>,
    pub bb_lower: Vec<f64>,
    pub adx: Vec<f64>,
    /// Only present when the provider is configured with a higher timeframe
    pub htf_ema: Option<Vec<f64>>,
}

impl IndicatorSnapshot {
    /// Create an empty snapshot; fill series with [`IndicatorSnapshot::with_series`].
    pub fn new(instrument: impl Into<String>, time: DateTime<Utc>, pip_size: f64) -> Self {
        Self {
            instrument: instrument.into(),
            time,
            pip_size,
            close: Vec::new(),
            rsi_fast: Vec::new(),
            rsi_slow: Vec::new(),
            ema_fast: Vec::new(),
            ema_slow: Vec::new(),
            macd_main: Vec::new(),
            macd_signal: Vec::new(),
            atr: Vec::new(),
            bb_upper: Vec::new(),
            bb_mid: Vec::new(),
            bb_lower: Vec::new(),
            adx: Vec::new(),
            htf_ema: None,
        }
    }

    /// Replace one series (most-recent-first).
    pub fn with_series(mut self, series: Series, values: Vec<f64>) -> Self {
        match series {
            Series::Close => self.close = values,
            Series::RsiFast => self.rsi_fast = values,
            Series::RsiSlow => self.rsi_slow = values,
            Series::EmaFast => self.ema_fast = values,
            Series::EmaSlow => self.ema_slow = values,
            Series::MacdMain => self.macd_main = values,
            Series::MacdSignal => self.macd_signal = values,
            Series::Atr => self.atr = values,
            Series::BollingerUpper => self.bb_upper = values,
            Series::BollingerMid => self.bb_mid = values,
            Series::BollingerLower => self.bb_lower = values,
            Series::Adx => self.adx = values,
            Series::HigherTimeframeEma => self.htf_ema = Some(values),
        }
        self
    }

    /// Borrow a series. A missing higher-timeframe series reads as empty.
    pub fn series(&self, series: Series) -> &[f64] {
        match series {
            Series::Close => &self.close,
            Series::RsiFast => &self.rsi_fast,
            Series::RsiSlow => &self.rsi_slow,
            Series::EmaFast => &self.ema_fast,
            Series::EmaSlow => &self.ema_slow,
            Series::MacdMain => &self.macd_main,
            Series::MacdSignal => &self.macd_signal,
            Series::Atr => &self.atr,
            Series::BollingerUpper => &self.bb_upper,
            Series::BollingerMid => &self.bb_mid,
            Series::BollingerLower => &self.bb_lower,
            Series::Adx => &self.adx,
            Series::HigherTimeframeEma => self.htf_ema.as_deref().unwrap_or(&[]),
        }
    }

    /// Bounds-checked read of `bars_ago` on a series; non-finite values read as `None`.
    pub fn value(&self, series: Series, bars_ago: usize) -> Option<f64> {
        self.series(series)
            .get(bars_ago)
            .copied()
            .filter(|v| v.is_finite())
    }

    /// The latest close.
    pub fn current_price(&self) -> Option<f64> {
        self.value(Series::Close, 0)
    }

    /// Whether a higher-timeframe series was supplied.
    pub fn has_higher_timeframe(&self) -> bool {
        self.htf_ema.as_ref().is_some_and(|s| !s.is_empty())
    }

    /// Fail with [`DataError::InsufficientHistory`] on the first unmet requirement.
    pub fn ensure_history(&self, requirements: &[HistoryRequirement]) -> Result<(), DataError> {
        for req in requirements {
            let available = self.series(req.series).len();
            if available < req.length {
                return Err(DataError::InsufficientHistory {
                    series: req.series.to_string(),
                    required: req.length,
                    available,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> IndicatorSnapshot {
        IndicatorSnapshot::new("EURUSD", Utc::now(), 0.0001)
            .with_series(Series::Close, vec![1.1010, 1.1000])
            .with_series(Series::RsiFast, vec![7.0, 12.0])
    }

    #[test]
    fn test_value_is_bounds_checked() {
        let snap = snapshot();
        assert_eq!(snap.value(Series::RsiFast, 0), Some(7.0));
        assert_eq!(snap.value(Series::RsiFast, 1), Some(12.0));
        assert_eq!(snap.value(Series::RsiFast, 2), None);
        assert_eq!(snap.value(Series::Atr, 0), None);
    }

    #[test]
    fn test_non_finite_reads_as_none() {
        let snap = snapshot().with_series(Series::Atr, vec![f64::NAN]);
        assert_eq!(snap.value(Series::Atr, 0), None);
    }

    #[test]
    fn test_ensure_history() {
        let snap = snapshot();
        assert!(snap.ensure_history(&[Series::RsiFast.at_least(2)]).is_ok());

        let err = snap
            .ensure_history(&[Series::Close.at_least(1), Series::Atr.at_least(21)])
            .unwrap_err();
        assert_eq!(
            err,
            DataError::InsufficientHistory {
                series: "atr".into(),
                required: 21,
                available: 0,
            }
        );
    }

    #[test]
    fn test_missing_higher_timeframe_reads_empty() {
        let snap = snapshot();
        assert!(!snap.has_higher_timeframe());
        assert!(snap.series(Series::HigherTimeframeEma).is_empty());
    }
}
