//! Dynamic stop-loss and take-profit placement.

use rust_decimal::Decimal;
use trading_core::{
    error::RiskInputError,
    types::{InstrumentSpec, Side},
};

/// Stop-loss and take-profit prices for a new order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProtectiveLevels {
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    /// Realized entry-to-stop distance after rounding, in price units
    pub stop_distance: Decimal,
}

/// Per-strategy stop settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopSettings {
    /// Minimum stop distance in pips
    pub base_pips: Decimal,
    pub atr_multiplier: Decimal,
    /// Overrides the configured risk:reward ratio
    pub risk_reward: Option<Decimal>,
}

/// Calculates ATR-scaled stops with a risk:reward take-profit.
#[derive(Debug, Clone)]
pub struct StopLossCalculator {
    risk_reward_ratio: Decimal,
    min_take_profit_pips: Decimal,
}

impl StopLossCalculator {
    /// Create a new calculator.
    pub fn new(risk_reward_ratio: Decimal, min_take_profit_pips: Decimal) -> Self {
        Self {
            risk_reward_ratio,
            min_take_profit_pips,
        }
    }

    /// Stop distance `max(base_pips, atr * atr_multiplier)`, widened to the broker
    /// minimum stop distance.
    pub fn stop_distance(
        &self,
        atr: f64,
        base_pips: Decimal,
        atr_multiplier: Decimal,
        instrument: &InstrumentSpec,
    ) -> Result<Decimal, RiskInputError> {
        if instrument.pip_size <= Decimal::ZERO {
            return Err(RiskInputError::NonPositivePipSize(instrument.pip_size));
        }
        if !atr.is_finite() {
            return Err(RiskInputError::NonFinite { name: "atr" });
        }
        let atr = Decimal::try_from(atr.max(0.0))
            .map_err(|_| RiskInputError::NonFinite { name: "atr" })?;

        let distance = instrument
            .pips_to_price(base_pips)
            .max(atr * atr_multiplier)
            .max(instrument.min_stop_distance());

        if distance <= Decimal::ZERO {
            return Err(RiskInputError::NonPositiveStopDistance(distance));
        }
        Ok(distance)
    }

    /// Take-profit distance for a realized stop distance, floored at the minimum
    /// take-profit and the broker minimum stop distance.
    pub fn take_profit_distance(
        &self,
        stop_distance: Decimal,
        risk_reward: Option<Decimal>,
        instrument: &InstrumentSpec,
    ) -> Decimal {
        let ratio = risk_reward.unwrap_or(self.risk_reward_ratio);
        (stop_distance * ratio)
            .max(instrument.pips_to_price(self.min_take_profit_pips))
            .max(instrument.min_stop_distance())
    }

    /// Stop-loss price, rounded onto the quote grid away from `entry`.
    pub fn calculate_dynamic_stop_loss(
        &self,
        side: Side,
        entry: Decimal,
        atr: f64,
        base_pips: Decimal,
        atr_multiplier: Decimal,
        instrument: &InstrumentSpec,
    ) -> Result<Decimal, RiskInputError> {
        check_entry(entry)?;
        let distance = self.stop_distance(atr, base_pips, atr_multiplier, instrument)?;
        Ok(match side {
            Side::Buy => instrument.floor_price(entry - distance),
            Side::Sell => instrument.ceil_price(entry + distance),
        })
    }

    /// Take-profit price for a realized stop distance, rounded away from `entry`.
    pub fn calculate_dynamic_take_profit(
        &self,
        side: Side,
        entry: Decimal,
        stop_distance: Decimal,
        risk_reward: Option<Decimal>,
        instrument: &InstrumentSpec,
    ) -> Result<Decimal, RiskInputError> {
        check_entry(entry)?;
        let distance = self.take_profit_distance(stop_distance, risk_reward, instrument);
        Ok(match side {
            Side::Buy => instrument.ceil_price(entry + distance),
            Side::Sell => instrument.floor_price(entry - distance),
        })
    }

    /// Both levels for a new order.
    pub fn protective_levels(
        &self,
        side: Side,
        entry: Decimal,
        atr: f64,
        settings: &StopSettings,
        instrument: &InstrumentSpec,
    ) -> Result<ProtectiveLevels, RiskInputError> {
        let stop_loss = self.calculate_dynamic_stop_loss(
            side,
            entry,
            atr,
            settings.base_pips,
            settings.atr_multiplier,
            instrument,
        )?;
        let stop_distance = (entry - stop_loss).abs();
        let take_profit = self.calculate_dynamic_take_profit(
            side,
            entry,
            stop_distance,
            settings.risk_reward,
            instrument,
        )?;

        Ok(ProtectiveLevels {
            stop_loss,
            take_profit,
            stop_distance,
        })
    }
}

fn check_entry(entry: Decimal) -> Result<(), RiskInputError> {
    if entry <= Decimal::ZERO {
        return Err(RiskInputError::NonPositivePrice(entry));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn calculator() -> StopLossCalculator {
        StopLossCalculator::new(dec!(2), dec!(10))
    }

    fn settings(risk_reward: Option<Decimal>) -> StopSettings {
        StopSettings {
            base_pips: dec!(20),
            atr_multiplier: dec!(1.5),
            risk_reward,
        }
    }

    #[test]
    fn test_base_pips_win_in_quiet_market() {
        let spec = InstrumentSpec::forex_major("EURUSD");
        let sl = calculator()
            .calculate_dynamic_stop_loss(Side::Buy, dec!(1.10000), 0.0005, dec!(20), dec!(1.5), &spec)
            .unwrap();
        assert_eq!(sl, dec!(1.09800));
    }

    #[test]
    fn test_atr_widens_stop() {
        let spec = InstrumentSpec::forex_major("EURUSD");
        // 0.0030 * 1.5 = 45 pips
        let levels = calculator()
            .protective_levels(Side::Sell, dec!(1.10000), 0.0030, &settings(None), &spec)
            .unwrap();
        assert_eq!(levels.stop_loss, dec!(1.10450));
        assert_eq!(levels.stop_distance, dec!(0.00450));
        assert_eq!(levels.take_profit, dec!(1.09100));
    }

    #[test]
    fn test_broker_minimum_widens_both_levels() {
        let mut spec = InstrumentSpec::forex_major("EURUSD");
        spec.min_stop_distance_pips = dec!(50);
        let levels = calculator()
            .protective_levels(Side::Buy, dec!(1.10000), 0.0, &settings(Some(dec!(0.5))), &spec)
            .unwrap();
        assert_eq!(levels.stop_loss, dec!(1.09500));
        // 50 * 0.5 = 25 pips is inside the 50 pip broker minimum
        assert_eq!(levels.take_profit, dec!(1.10500));
    }

    #[test]
    fn test_min_take_profit_floor() {
        let spec = InstrumentSpec::forex_major("EURUSD");
        let tp = calculator()
            .calculate_dynamic_take_profit(Side::Buy, dec!(1.10000), dec!(0.0003), Some(dec!(1)), &spec)
            .unwrap();
        assert_eq!(tp, dec!(1.10100));
    }

    #[test]
    fn test_rounding_moves_away_from_entry() {
        let spec = InstrumentSpec::forex_major("EURUSD");
        // 0.00123 * 1.5 = 0.001845 -> unrounded stop 1.098155
        let sl = calculator()
            .calculate_dynamic_stop_loss(Side::Buy, dec!(1.10000), 0.00123, dec!(1), dec!(1.5), &spec)
            .unwrap();
        assert_eq!(sl, dec!(1.09815));
    }

    #[test]
    fn test_invalid_inputs() {
        let spec = InstrumentSpec::forex_major("EURUSD");
        let calc = calculator();
        assert!(matches!(
            calc.calculate_dynamic_stop_loss(Side::Buy, dec!(1.1), f64::NAN, dec!(20), dec!(1), &spec),
            Err(RiskInputError::NonFinite { .. })
        ));
        assert!(matches!(
            calc.calculate_dynamic_stop_loss(Side::Buy, dec!(0), 0.001, dec!(20), dec!(1), &spec),
            Err(RiskInputError::NonPositivePrice(_))
        ));
        assert!(matches!(
            calc.calculate_dynamic_stop_loss(Side::Buy, dec!(1.1), 0.0, dec!(0), dec!(1), &spec),
            Err(RiskInputError::NonPositiveStopDistance(_))
        ));
    }
}
