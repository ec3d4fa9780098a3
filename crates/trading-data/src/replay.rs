//! Bar-replay indicator provider.
//!
//! Bars are revealed one at a time with [`ReplayIndicatorProvider::advance`];
//! snapshots only ever see the revealed prefix, so a replay cannot look ahead.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, trace};
use trading_core::error::DataError;
use trading_core::traits::{Indicator, IndicatorProvider};
use trading_core::types::{Bar, IndicatorSnapshot, Series};
use trading_indicators::{Adx, Atr, BollingerBands, Ema, Macd, Rsi};

/// Indicator periods used to build snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub rsi_fast_period: usize,
    pub rsi_slow_period: usize,
    pub ema_fast_period: usize,
    pub ema_slow_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub atr_period: usize,
    pub bollinger_period: usize,
    pub bollinger_std_dev: f64,
    pub adx_period: usize,
    /// Values kept per series, most recent first
    pub lookback: usize,
    /// Bars per higher-timeframe bar; no higher-timeframe series when unset
    pub higher_timeframe_factor: Option<usize>,
    pub higher_timeframe_ema_period: usize,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            rsi_fast_period: 2,
            rsi_slow_period: 14,
            ema_fast_period: 20,
            ema_slow_period: 50,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            atr_period: 14,
            bollinger_period: 20,
            bollinger_std_dev: 2.0,
            adx_period: 14,
            lookback: 30,
            higher_timeframe_factor: None,
            higher_timeframe_ema_period: 50,
        }
    }
}

impl SnapshotConfig {
    pub fn validate(&self) -> Result<(), String> {
        let periods = [
            ("rsi_fast_period", self.rsi_fast_period),
            ("rsi_slow_period", self.rsi_slow_period),
            ("ema_fast_period", self.ema_fast_period),
            ("ema_slow_period", self.ema_slow_period),
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
            ("atr_period", self.atr_period),
            ("adx_period", self.adx_period),
            ("lookback", self.lookback),
            ("higher_timeframe_ema_period", self.higher_timeframe_ema_period),
        ];
        if let Some((name, _)) = periods.iter().find(|(_, p)| *p == 0) {
            return Err(format!("{name} must be positive"));
        }
        if self.macd_fast >= self.macd_slow {
            return Err("macd_fast must be below macd_slow".to_string());
        }
        if self.bollinger_period < 2 {
            return Err("bollinger_period must be at least 2".to_string());
        }
        if self.bollinger_std_dev.is_nan() || self.bollinger_std_dev <= 0.0 {
            return Err("bollinger_std_dev must be positive".to_string());
        }
        if self.higher_timeframe_factor.is_some_and(|f| f < 2) {
            return Err("higher_timeframe_factor must be at least 2".to_string());
        }
        Ok(())
    }

    /// Bars needed before the slowest indicator yields its first value.
    pub fn warmup(&self) -> usize {
        [
            self.rsi_fast_period + 1,
            self.rsi_slow_period + 1,
            self.ema_fast_period,
            self.ema_slow_period,
            self.macd_slow + self.macd_signal - 1,
            self.atr_period + 1,
            self.bollinger_period,
            2 * self.adx_period,
        ]
        .into_iter()
        .max()
        .unwrap_or(1)
    }

    /// Bars fed to the indicators per snapshot.
    fn window(&self) -> usize {
        // Wilder-smoothed series need extra history to converge
        2 * self.warmup() + self.lookback
    }
}

struct Feed {
    bars: Vec<Bar>,
    pip_size: f64,
    /// Number of bars revealed so far
    cursor: usize,
}

/// Replays CSV bars and computes snapshots over the revealed history.
pub struct ReplayIndicatorProvider {
    config: SnapshotConfig,
    feeds: RwLock<HashMap<String, Feed>>,
}

impl ReplayIndicatorProvider {
    pub fn new(config: SnapshotConfig) -> Result<Self, DataError> {
        config
            .validate()
            .map_err(|reason| DataError::ParseError(format!("snapshot settings: {reason}")))?;
        Ok(Self {
            config,
            feeds: RwLock::new(HashMap::new()),
        })
    }

    /// Register the bars of `instrument`, oldest first. Nothing is revealed yet.
    pub fn add_feed(&self, instrument: impl Into<String>, bars: Vec<Bar>, pip_size: f64) {
        let instrument = instrument.into();
        debug!(%instrument, bars = bars.len(), "Replay feed added");
        self.feeds.write().insert(
            instrument,
            Feed {
                bars,
                pip_size,
                cursor: 0,
            },
        );
    }

    /// Reveal the next bar of `instrument`; `None` once the feed is exhausted.
    pub fn advance(&self, instrument: &str) -> Option<Bar> {
        let mut feeds = self.feeds.write();
        let feed = feeds.get_mut(instrument)?;
        let bar = feed.bars.get(feed.cursor).copied()?;
        feed.cursor += 1;
        Some(bar)
    }

    /// Reveal the first `count` bars at once, e.g. to skip indicator warm-up.
    pub fn skip(&self, instrument: &str, count: usize) -> usize {
        let mut feeds = self.feeds.write();
        let Some(feed) = feeds.get_mut(instrument) else {
            return 0;
        };
        feed.cursor = (feed.cursor + count).min(feed.bars.len());
        feed.cursor
    }

    /// Bars still to be revealed.
    pub fn remaining(&self, instrument: &str) -> usize {
        self.feeds
            .read()
            .get(instrument)
            .map(|f| f.bars.len() - f.cursor)
            .unwrap_or(0)
    }

    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }
}

#[async_trait]
impl IndicatorProvider for ReplayIndicatorProvider {
    async fn get_snapshot(&self, instrument: &str) -> Result<IndicatorSnapshot, DataError> {
        let feeds = self.feeds.read();
        let feed = feeds
            .get(instrument)
            .filter(|f| f.cursor > 0)
            .ok_or_else(|| DataError::NoDataAvailable(instrument.to_string()))?;

        let revealed = &feed.bars[..feed.cursor];
        let start = revealed.len().saturating_sub(self.config.window());
        let htf_start = self
            .config
            .higher_timeframe_factor
            .map(|factor| {
                let needed = factor * (2 * self.config.higher_timeframe_ema_period + self.config.lookback);
                revealed.len().saturating_sub(needed)
            })
            .unwrap_or(start);

        let mut snapshot =
            build_snapshot(instrument, &revealed[start..], feed.pip_size, &self.config)?;
        if let Some(factor) = self.config.higher_timeframe_factor {
            let htf = higher_timeframe_ema(&revealed[htf_start..], factor, &self.config);
            snapshot = snapshot.with_series(Series::HigherTimeframeEma, htf);
        }
        trace!(%instrument, bars = feed.cursor, "Snapshot built");
        Ok(snapshot)
    }

    fn name(&self) -> &str {
        "csv-replay"
    }
}

/// Compute every snapshot series over `bars` (oldest first).
///
/// Series shorter than their warm-up come back empty; readers check lengths
/// through [`IndicatorSnapshot::ensure_history`].
pub fn build_snapshot(
    instrument: &str,
    bars: &[Bar],
    pip_size: f64,
    config: &SnapshotConfig,
) -> Result<IndicatorSnapshot, DataError> {
    let last = bars
        .last()
        .ok_or_else(|| DataError::NoDataAvailable(instrument.to_string()))?;
    let time = last
        .datetime()
        .ok_or_else(|| DataError::ParseError(format!("bar timestamp {} out of range", last.timestamp)))?;

    let close: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let high: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let low: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let keep = config.lookback;

    let macd = Macd::with_periods(config.macd_fast, config.macd_slow, config.macd_signal)
        .calculate(&close);
    let bands = BollingerBands::with_params(config.bollinger_period, config.bollinger_std_dev)
        .calculate(&close);

    let snapshot = IndicatorSnapshot::new(instrument, time, pip_size)
        .with_series(Series::Close, recent_first(&close, keep))
        .with_series(
            Series::RsiFast,
            recent_first(&Rsi::new(config.rsi_fast_period).calculate(&close), keep),
        )
        .with_series(
            Series::RsiSlow,
            recent_first(&Rsi::new(config.rsi_slow_period).calculate(&close), keep),
        )
        .with_series(
            Series::EmaFast,
            recent_first(&Ema::new(config.ema_fast_period).calculate(&close), keep),
        )
        .with_series(
            Series::EmaSlow,
            recent_first(&Ema::new(config.ema_slow_period).calculate(&close), keep),
        )
        .with_series(
            Series::MacdMain,
            recent_first(&macd.iter().map(|m| m.macd).collect::<Vec<_>>(), keep),
        )
        .with_series(
            Series::MacdSignal,
            recent_first(&macd.iter().map(|m| m.signal).collect::<Vec<_>>(), keep),
        )
        .with_series(
            Series::Atr,
            recent_first(&Atr::new(config.atr_period).calculate_ohlc(&high, &low, &close), keep),
        )
        .with_series(
            Series::BollingerUpper,
            recent_first(&bands.iter().map(|b| b.upper).collect::<Vec<_>>(), keep),
        )
        .with_series(
            Series::BollingerMid,
            recent_first(&bands.iter().map(|b| b.middle).collect::<Vec<_>>(), keep),
        )
        .with_series(
            Series::BollingerLower,
            recent_first(&bands.iter().map(|b| b.lower).collect::<Vec<_>>(), keep),
        )
        .with_series(
            Series::Adx,
            recent_first(&Adx::new(config.adx_period).calculate_ohlc(&high, &low, &close), keep),
        );
    Ok(snapshot)
}

/// EMA of closes aggregated into `factor`-bar groups aligned to the latest bar.
fn higher_timeframe_ema(bars: &[Bar], factor: usize, config: &SnapshotConfig) -> Vec<f64> {
    let mut closes: Vec<f64> = bars.rchunks(factor).map(|chunk| chunk[chunk.len() - 1].close).collect();
    closes.reverse();
    recent_first(
        &Ema::new(config.higher_timeframe_ema_period).calculate(&closes),
        config.lookback,
    )
}

/// Last `keep` values of an oldest-first series, most recent first.
fn recent_first(values: &[f64], keep: usize) -> Vec<f64> {
    values.iter().rev().take(keep).copied().collect()
}
