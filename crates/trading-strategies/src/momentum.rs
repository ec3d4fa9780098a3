//! Momentum crossover.
//!
//! Trades MACD crossing its signal line when the lines separate by at least a
//! minimum distance. Optional filters require agreement from the EMA trend,
//! a minimum ADX and the higher-timeframe EMA when the provider supplies it.

use trading_core::{
    error::StrategyError,
    types::{HistoryRequirement, IndicatorSnapshot, Series, Side, Signal},
};

use crate::config::{MomentumCrossoverParams, StrategyConfig, StrategyKind, StrategyParams};
use crate::generator::{params_mismatch, SignalGenerator};

#[derive(Debug, Default)]
pub struct MomentumCrossover;

impl MomentumCrossover {
    pub fn new() -> Self {
        Self
    }

    fn params(config: &StrategyConfig) -> Result<&MomentumCrossoverParams, StrategyError> {
        match &config.params {
            StrategyParams::MomentumCrossover(p) => Ok(p),
            _ => Err(params_mismatch(config)),
        }
    }

    fn crossed(snapshot: &IndicatorSnapshot) -> Option<(Side, f64)> {
        let main = snapshot.value(Series::MacdMain, 0)?;
        let signal = snapshot.value(Series::MacdSignal, 0)?;
        let prev_main = snapshot.value(Series::MacdMain, 1)?;
        let prev_signal = snapshot.value(Series::MacdSignal, 1)?;

        if prev_main <= prev_signal && main > signal {
            Some((Side::Buy, main - signal))
        } else if prev_main >= prev_signal && main < signal {
            Some((Side::Sell, signal - main))
        } else {
            None
        }
    }

    /// Whether `fast` sits on the `side` of `slow`.
    fn agrees(side: Side, fast: f64, slow: f64) -> bool {
        match side {
            Side::Buy => fast > slow,
            Side::Sell => fast < slow,
        }
    }

    fn passes_filters(p: &MomentumCrossoverParams, snapshot: &IndicatorSnapshot, side: Side) -> bool {
        if p.require_trend {
            match (
                snapshot.value(Series::EmaFast, 0),
                snapshot.value(Series::EmaSlow, 0),
            ) {
                (Some(fast), Some(slow)) if Self::agrees(side, fast, slow) => {}
                _ => return false,
            }
        }

        if let Some(min_adx) = p.min_adx {
            if !snapshot.value(Series::Adx, 0).is_some_and(|adx| adx >= min_adx) {
                return false;
            }
        }

        if p.use_higher_timeframe && snapshot.has_higher_timeframe() {
            match (
                snapshot.current_price(),
                snapshot.value(Series::HigherTimeframeEma, 0),
            ) {
                (Some(price), Some(htf)) if Self::agrees(side, price, htf) => {}
                _ => return false,
            }
        }

        true
    }
}

impl SignalGenerator for MomentumCrossover {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MomentumCrossover
    }

    fn requirements(
        &self,
        config: &StrategyConfig,
    ) -> Result<Vec<HistoryRequirement>, StrategyError> {
        let p = Self::params(config)?;
        let mut reqs = vec![Series::MacdMain.at_least(2), Series::MacdSignal.at_least(2)];
        if p.require_trend {
            reqs.push(Series::EmaFast.at_least(1));
            reqs.push(Series::EmaSlow.at_least(1));
        }
        if p.min_adx.is_some() {
            reqs.push(Series::Adx.at_least(1));
        }
        if p.use_higher_timeframe {
            reqs.push(Series::Close.at_least(1));
        }
        Ok(reqs)
    }

    fn evaluate(
        &mut self,
        snapshot: &IndicatorSnapshot,
        config: &StrategyConfig,
    ) -> Result<Option<Signal>, StrategyError> {
        let p = Self::params(config)?;
        if snapshot.pip_size <= 0.0 {
            return Ok(None);
        }
        let Some((side, separation)) = Self::crossed(snapshot) else {
            return Ok(None);
        };

        let separation_pips = separation / snapshot.pip_size;
        if separation_pips < p.min_separation_pips {
            return Ok(None);
        }
        if !Self::passes_filters(p, snapshot, side) {
            return Ok(None);
        }

        let confidence = p.base_confidence + p.confidence_per_pip * separation_pips;
        Ok(Some(
            Signal::new(&config.name, &snapshot.instrument, side, confidence, snapshot.time)
                .with_reason(format!("MACD cross, separation {separation_pips:.2} pips")),
        ))
    }
}
