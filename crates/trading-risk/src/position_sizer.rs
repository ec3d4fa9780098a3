//! Risk-based position sizing.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use trading_core::{error::RiskInputError, types::InstrumentSpec};

/// Account-level adjustments applied on top of a strategy's base risk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskAdjustments {
    pub win_multiplier: Decimal,
    pub loss_divisor: Decimal,
    pub volatility_multiplier: Decimal,
}

impl Default for RiskAdjustments {
    fn default() -> Self {
        Self {
            win_multiplier: Decimal::ONE,
            loss_divisor: Decimal::ONE,
            volatility_multiplier: Decimal::ONE,
        }
    }
}

/// Inputs for one sizing decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingRequest {
    pub equity: Decimal,
    pub base_risk_percent: Decimal,
    /// Signal confidence, `[0, 100]`
    pub confidence: f64,
    /// Stop distance in price units
    pub stop_loss_distance: Decimal,
    /// Volume scale after sizing (grid levels)
    pub size_multiplier: Decimal,
    pub adjustments: RiskAdjustments,
}

/// Result of a successful sizing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sizing {
    /// Money at risk if the stop is hit
    pub risk_amount: Decimal,
    /// Lots before clamping and rounding
    pub raw_volume: Decimal,
    /// Tradable volume
    pub volume: Decimal,
}

/// Position sizer converting money at risk into lots.
#[derive(Debug, Clone)]
pub struct PositionSizer {
    /// Upper bound on a strategy's base risk percent
    risk_cap_pct: Decimal,
    /// Hard ceiling on money at risk per trade, percent of equity
    max_single_trade_risk_pct: Decimal,
    /// Configured volume ceiling
    max_safe_lot: Decimal,
}

impl PositionSizer {
    /// Create a new position sizer.
    pub fn new(
        risk_cap_pct: Decimal,
        max_single_trade_risk_pct: Decimal,
        max_safe_lot: Decimal,
    ) -> Self {
        Self {
            risk_cap_pct,
            max_single_trade_risk_pct,
            max_safe_lot,
        }
    }

    /// Money at risk for the request, after the single-trade ceiling.
    pub fn risk_amount(&self, request: &SizingRequest) -> Result<Decimal, RiskInputError> {
        if request.equity <= Decimal::ZERO {
            return Err(RiskInputError::NonPositiveEquity(request.equity));
        }
        if !(0.0..=100.0).contains(&request.confidence) {
            return Err(RiskInputError::InvalidConfidence(request.confidence));
        }
        let confidence = Decimal::try_from(request.confidence)
            .map_err(|_| RiskInputError::InvalidConfidence(request.confidence))?;

        let adj = &request.adjustments;
        let loss_divisor = adj.loss_divisor.max(Decimal::ONE);
        let base = request.base_risk_percent.min(self.risk_cap_pct).max(Decimal::ZERO);

        let risk = request.equity * base / dec!(100) * confidence / dec!(100)
            * adj.win_multiplier
            / loss_divisor
            * adj.volatility_multiplier;

        let ceiling = request.equity * self.max_single_trade_risk_pct / dec!(100);
        Ok(risk.min(ceiling))
    }

    /// Largest volume allowed for `instrument`, on the lot grid and never below `min_lot`.
    pub fn max_safe_lot(&self, instrument: &InstrumentSpec) -> Decimal {
        let ceiling = instrument.floor_volume(self.max_safe_lot.min(instrument.max_lot));
        ceiling.max(instrument.min_lot)
    }

    /// Size an order. The volume is always within `[min_lot, max_safe_lot]` and a
    /// multiple of the lot step.
    pub fn calculate(
        &self,
        request: &SizingRequest,
        instrument: &InstrumentSpec,
    ) -> Result<Sizing, RiskInputError> {
        if instrument.pip_value <= Decimal::ZERO {
            return Err(RiskInputError::NonPositivePipValue(instrument.pip_value));
        }
        if instrument.pip_size <= Decimal::ZERO {
            return Err(RiskInputError::NonPositivePipSize(instrument.pip_size));
        }
        if request.stop_loss_distance <= Decimal::ZERO {
            return Err(RiskInputError::NonPositiveStopDistance(
                request.stop_loss_distance,
            ));
        }

        let risk_amount = self.risk_amount(request)?;
        let stop_pips = request.stop_loss_distance / instrument.pip_size;
        let raw_volume = risk_amount / (stop_pips * instrument.pip_value)
            * request.size_multiplier.max(Decimal::ZERO);

        Ok(Sizing {
            risk_amount,
            raw_volume,
            volume: self.clamp_volume(raw_volume, instrument),
        })
    }

    /// Clamp to `[min_lot, max_safe_lot]` and round down to the lot step.
    pub fn clamp_volume(&self, volume: Decimal, instrument: &InstrumentSpec) -> Decimal {
        let max = self.max_safe_lot(instrument);
        let clamped = volume.max(instrument.min_lot).min(max);
        instrument.floor_volume(clamped).max(instrument.min_lot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizer() -> PositionSizer {
        PositionSizer::new(dec!(5), dec!(10), dec!(10))
    }

    fn request(equity: Decimal, base: Decimal, confidence: f64, stop: Decimal) -> SizingRequest {
        SizingRequest {
            equity,
            base_risk_percent: base,
            confidence,
            stop_loss_distance: stop,
            size_multiplier: Decimal::ONE,
            adjustments: RiskAdjustments::default(),
        }
    }

    #[test]
    fn test_risk_amount_scenario() {
        let amount = sizer()
            .risk_amount(&request(dec!(1000000), dec!(2), 80.0, dec!(0.0020)))
            .unwrap();
        assert_eq!(amount, dec!(16000));
    }

    #[test]
    fn test_base_risk_is_capped() {
        let amount = sizer()
            .risk_amount(&request(dec!(10000), dec!(50), 100.0, dec!(0.0020)))
            .unwrap();
        // min(50, 5) percent
        assert_eq!(amount, dec!(500));
    }

    #[test]
    fn test_single_trade_ceiling() {
        let sizer = PositionSizer::new(dec!(100), dec!(10), dec!(100));
        let mut req = request(dec!(10000), dec!(20), 100.0, dec!(0.0020));
        req.adjustments.win_multiplier = dec!(2);
        // 20% * 2 = 40% -> ceiling 10%
        assert_eq!(sizer.risk_amount(&req).unwrap(), dec!(1000));
    }

    #[test]
    fn test_lots_from_stop() {
        let spec = InstrumentSpec::forex_major("EURUSD");
        // risk 10000 * 1% = 100; 20 pips * $10 = $200 per lot -> 0.5 lots
        let sizing = sizer()
            .calculate(&request(dec!(10000), dec!(1), 100.0, dec!(0.0020)), &spec)
            .unwrap();
        assert_eq!(sizing.risk_amount, dec!(100));
        assert_eq!(sizing.volume, dec!(0.50));
    }

    #[test]
    fn test_size_multiplier_scales_volume() {
        let spec = InstrumentSpec::forex_major("EURUSD");
        let mut req = request(dec!(10000), dec!(1), 100.0, dec!(0.0020));
        req.size_multiplier = dec!(2.25);
        let sizing = sizer().calculate(&req, &spec).unwrap();
        assert_eq!(sizing.volume, dec!(1.12));
    }

    #[test]
    fn test_clamps_to_bounds() {
        let spec = InstrumentSpec::forex_major("EURUSD");
        let tiny = sizer()
            .calculate(&request(dec!(100), dec!(1), 10.0, dec!(0.0100)), &spec)
            .unwrap();
        assert_eq!(tiny.volume, spec.min_lot);

        let huge = sizer()
            .calculate(&request(dec!(100000000), dec!(5), 100.0, dec!(0.0001)), &spec)
            .unwrap();
        assert_eq!(huge.volume, dec!(10));
    }

    #[test]
    fn test_invalid_inputs() {
        let mut spec = InstrumentSpec::forex_major("EURUSD");
        let sizer = sizer();

        assert!(matches!(
            sizer.calculate(&request(dec!(10000), dec!(1), f64::NAN, dec!(0.002)), &spec),
            Err(RiskInputError::InvalidConfidence(_))
        ));
        assert!(matches!(
            sizer.calculate(&request(dec!(10000), dec!(1), 50.0, Decimal::ZERO), &spec),
            Err(RiskInputError::NonPositiveStopDistance(_))
        ));
        assert!(matches!(
            sizer.calculate(&request(dec!(-5), dec!(1), 50.0, dec!(0.002)), &spec),
            Err(RiskInputError::NonPositiveEquity(_))
        ));

        spec.pip_value = Decimal::ZERO;
        assert!(matches!(
            sizer.calculate(&request(dec!(10000), dec!(1), 50.0, dec!(0.002)), &spec),
            Err(RiskInputError::NonPositivePipValue(_))
        ));
    }
}
