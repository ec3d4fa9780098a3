//! Account-level risk state.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Volatility above this multiple of the baseline shrinks risk.
const HIGH_VOLATILITY_RATIO: f64 = 1.5;
/// Volatility below this multiple of the baseline grows risk.
const LOW_VOLATILITY_RATIO: f64 = 0.7;
const BASELINE_DECAY: f64 = 0.9;

/// Running ATR baseline and the risk multiplier it implies for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityRegime {
    pub baseline: f64,
    /// Within `[0.5, 2.0]`
    pub multiplier: Decimal,
}

impl VolatilityRegime {
    /// Seed the baseline from the first sample.
    pub fn seeded(atr: f64) -> Self {
        Self {
            baseline: atr,
            multiplier: Decimal::ONE,
        }
    }

    /// Fold a sample into the baseline and re-derive the multiplier.
    pub fn update(&mut self, atr: f64) {
        self.baseline = BASELINE_DECAY * self.baseline + (1.0 - BASELINE_DECAY) * atr;
        if self.baseline <= 0.0 {
            self.multiplier = Decimal::ONE;
            return;
        }
        let ratio = atr / self.baseline;
        self.multiplier = if ratio > HIGH_VOLATILITY_RATIO {
            dec!(0.7)
        } else if ratio < LOW_VOLATILITY_RATIO {
            dec!(1.3)
        } else {
            Decimal::ONE
        };
    }
}

/// Risk state owned by the risk manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskState {
    /// `(initial - equity) / initial * 100`
    pub current_drawdown_pct: Decimal,
    /// Loss since the daily anchor, never negative
    pub daily_loss_pct: Decimal,
    pub daily_anchor_equity: Decimal,
    pub daily_anchor_time: Option<DateTime<Utc>>,
    pub consecutive_wins: u32,
    pub consecutive_losses: u32,
    /// Within `[1, 2]`
    pub win_multiplier: Decimal,
    /// Within `[1, 3]`
    pub loss_divisor: Decimal,
    pub volatility: HashMap<String, VolatilityRegime>,
    pub emergency_stop_active: bool,
    pub emergency_reason: Option<String>,
    /// Open positions as last reported by the position manager
    pub open_positions: usize,
    /// Equity seen by the last refresh
    pub equity: Decimal,
}

impl Default for RiskState {
    fn default() -> Self {
        Self {
            current_drawdown_pct: Decimal::ZERO,
            daily_loss_pct: Decimal::ZERO,
            daily_anchor_equity: Decimal::ZERO,
            daily_anchor_time: None,
            consecutive_wins: 0,
            consecutive_losses: 0,
            win_multiplier: Decimal::ONE,
            loss_divisor: Decimal::ONE,
            volatility: HashMap::new(),
            emergency_stop_active: false,
            emergency_reason: None,
            open_positions: 0,
            equity: Decimal::ZERO,
        }
    }
}

impl RiskState {
    /// Volatility multiplier for `instrument`; 1 until a sample is seen.
    pub fn volatility_multiplier(&self, instrument: &str) -> Decimal {
        self.volatility
            .get(instrument)
            .map_or(Decimal::ONE, |v| v.multiplier)
    }

    /// ATR baseline for `instrument`, if seeded.
    pub fn baseline_volatility(&self, instrument: &str) -> Option<f64> {
        self.volatility.get(instrument).map(|v| v.baseline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regime_thresholds() {
        let mut regime = VolatilityRegime::seeded(0.0010);
        assert_eq!(regime.multiplier, Decimal::ONE);

        // baseline -> 0.0012, ratio 0.0030 / 0.0012 = 2.5
        regime.update(0.0030);
        assert_eq!(regime.multiplier, dec!(0.7));

        // baseline -> 0.00108 + 0.00002 = 0.0011, ratio ~0.18
        regime.update(0.0002);
        assert_eq!(regime.multiplier, dec!(1.3));

        regime.update(regime.baseline);
        assert_eq!(regime.multiplier, Decimal::ONE);
    }
}
