//! Grid/recovery strategy.
//!
//! The first evaluation on an instrument records an anchor price. Level `k`
//! (0-based) fires once price has moved `(k + 1) * spacing` pips away from the
//! anchor, trading against the move with volume scaled by `multiplier^k`. The
//! anchor only moves on [`SignalGenerator::reset`] or when the grid's
//! positions are all gone. A level whose order never reached the broker is
//! handed back through [`SignalGenerator::on_order_failed`].

use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::debug;
use trading_core::{
    error::StrategyError,
    types::{HistoryRequirement, IndicatorSnapshot, Series, Side, Signal},
};

use crate::config::{GridRecoveryParams, StrategyConfig, StrategyKind, StrategyParams};
use crate::generator::{params_mismatch, SignalGenerator};

#[derive(Debug, Clone, Copy, PartialEq)]
struct GridState {
    anchor: f64,
    active_levels: u32,
}

#[derive(Debug, Default)]
pub struct GridRecovery {
    grids: HashMap<String, GridState>,
}

impl GridRecovery {
    pub fn new() -> Self {
        Self::default()
    }

    fn params(config: &StrategyConfig) -> Result<&GridRecoveryParams, StrategyError> {
        match &config.params {
            StrategyParams::GridRecovery(p) => Ok(p),
            _ => Err(params_mismatch(config)),
        }
    }

    /// Anchor price for `instrument`, if one is set.
    pub fn anchor(&self, instrument: &str) -> Option<f64> {
        self.grids.get(instrument).map(|g| g.anchor)
    }

    /// Levels fired since the anchor was set.
    pub fn active_levels(&self, instrument: &str) -> u32 {
        self.grids.get(instrument).map_or(0, |g| g.active_levels)
    }
}

fn level_multiplier(multiplier: Decimal, level: u32) -> Option<Decimal> {
    (0..level).try_fold(Decimal::ONE, |acc, _| acc.checked_mul(multiplier))
}

impl SignalGenerator for GridRecovery {
    fn kind(&self) -> StrategyKind {
        StrategyKind::GridRecovery
    }

    fn requirements(
        &self,
        config: &StrategyConfig,
    ) -> Result<Vec<HistoryRequirement>, StrategyError> {
        Self::params(config)?;
        Ok(vec![Series::Close.at_least(1)])
    }

    fn evaluate(
        &mut self,
        snapshot: &IndicatorSnapshot,
        config: &StrategyConfig,
    ) -> Result<Option<Signal>, StrategyError> {
        let p = Self::params(config)?;
        let Some(price) = snapshot.current_price() else {
            return Ok(None);
        };
        if snapshot.pip_size <= 0.0 {
            return Ok(None);
        }

        if !self.grids.contains_key(&snapshot.instrument) {
            debug!(strategy = %config.name, instrument = %snapshot.instrument, anchor = price, "Grid anchored");
            self.grids.insert(
                snapshot.instrument.clone(),
                GridState {
                    anchor: price,
                    active_levels: 0,
                },
            );
            return Ok(None);
        }
        let Some(grid) = self.grids.get_mut(&snapshot.instrument) else {
            return Ok(None);
        };

        if grid.active_levels >= p.max_levels {
            return Ok(None);
        }

        let level = grid.active_levels;
        let distance_pips = (price - grid.anchor).abs() / snapshot.pip_size;
        if distance_pips < f64::from(level + 1) * p.spacing_pips {
            return Ok(None);
        }

        let Some(size_multiplier) = level_multiplier(p.multiplier, level) else {
            debug!(strategy = %config.name, level, "Grid level volume out of range");
            return Ok(None);
        };
        let side = if price < grid.anchor { Side::Buy } else { Side::Sell };
        grid.active_levels += 1;

        Ok(Some(
            Signal::new(&config.name, &snapshot.instrument, side, p.confidence, snapshot.time)
                .with_size_multiplier(size_multiplier)
                .with_reason(format!(
                    "grid level {level} at {distance_pips:.1} pips from {:.5}",
                    grid.anchor
                )),
        ))
    }

    fn reset(&mut self) {
        self.grids.clear();
    }

    fn on_order_failed(&mut self, instrument: &str) {
        if let Some(grid) = self.grids.get_mut(instrument) {
            grid.active_levels = grid.active_levels.saturating_sub(1);
            debug!(instrument, active_levels = grid.active_levels, "Grid level released");
        }
    }

    fn on_flat(&mut self, instrument: &str) {
        // Only a grid that traded has a cycle to complete
        if self.grids.get(instrument).is_some_and(|g| g.active_levels > 0) {
            debug!(instrument, "Grid cycle complete, anchor cleared");
            self.grids.remove(instrument);
        }
    }
}
