//! Trailing stop rules.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use trading_core::types::{InstrumentSpec, Position, Side};

/// Trailing stop configuration, distances in pips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailingConfig {
    pub enabled: bool,
    /// Profit needed before the stop starts to trail
    pub activation_pips: Decimal,
    /// Distance kept between price and the trailed stop
    pub distance_pips: Decimal,
    /// Minimum improvement per modification
    pub step_pips: Decimal,
}

impl Default for TrailingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            activation_pips: dec!(20),
            distance_pips: dec!(15),
            step_pips: dec!(5),
        }
    }
}

impl TrailingConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.activation_pips < Decimal::ZERO
            || self.distance_pips <= Decimal::ZERO
            || self.step_pips < Decimal::ZERO
        {
            return Err(
                "trailing: activation and step must be >= 0, distance must be > 0".into(),
            );
        }
        Ok(())
    }
}

/// New stop for `position` at `price`, or `None` when the stop should stay.
///
/// The candidate sits `distance_pips` behind price (and at least the broker
/// minimum stop distance away). It is accepted only once profit reaches the
/// activation level, when it improves the current stop by at least one step,
/// and when it does not sit on the losing side of the open price.
pub fn next_stop(
    position: &Position,
    price: Decimal,
    instrument: &InstrumentSpec,
    config: &TrailingConfig,
) -> Option<Decimal> {
    if !config.enabled {
        return None;
    }
    let profit_pips = position.profit_pips(price, instrument.pip_size);
    if profit_pips < config.activation_pips {
        return None;
    }

    let distance = instrument
        .pips_to_price(config.distance_pips)
        .max(instrument.min_stop_distance());
    let candidate = match position.side {
        Side::Buy => instrument.floor_price(price - distance),
        Side::Sell => instrument.ceil_price(price + distance),
    };

    let beyond_open = match position.side {
        Side::Buy => candidate >= position.open_price,
        Side::Sell => candidate <= position.open_price,
    };
    if !beyond_open {
        return None;
    }

    let current = position.stop_loss;
    if current > Decimal::ZERO {
        if !position.side.is_tighter(candidate, current) {
            return None;
        }
        if (candidate - current).abs() < instrument.pips_to_price(config.step_pips) {
            return None;
        }
    }

    Some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use trading_core::types::{OrderRequest, PositionId};

    fn position(side: Side, open: Decimal, stop: Decimal) -> Position {
        let request = OrderRequest::market("EURUSD", side, dec!(1), open).with_stops(stop, Decimal::ZERO);
        Position::opening(PositionId::new(), &request, Utc::now())
    }

    #[test]
    fn test_not_active_before_threshold() {
        let spec = InstrumentSpec::forex_major("EURUSD");
        let pos = position(Side::Buy, dec!(1.10000), dec!(1.09800));
        assert!(next_stop(&pos, dec!(1.10150), &spec, &TrailingConfig::default()).is_none());
    }

    #[test]
    fn test_trails_long() {
        let spec = InstrumentSpec::forex_major("EURUSD");
        let pos = position(Side::Buy, dec!(1.10000), dec!(1.09800));
        // +30 pips -> stop at price - 15 pips
        assert_eq!(
            next_stop(&pos, dec!(1.10300), &spec, &TrailingConfig::default()),
            Some(dec!(1.10150))
        );
    }

    #[test]
    fn test_never_loosens_and_respects_step() {
        let spec = InstrumentSpec::forex_major("EURUSD");
        let pos = position(Side::Buy, dec!(1.10000), dec!(1.10150));
        // Candidate 1.10180 improves by only 3 pips
        assert!(next_stop(&pos, dec!(1.10330), &spec, &TrailingConfig::default()).is_none());
        // Candidate below current stop
        assert!(next_stop(&pos, dec!(1.10250), &spec, &TrailingConfig::default()).is_none());
        // 6 pips better
        assert_eq!(
            next_stop(&pos, dec!(1.10360), &spec, &TrailingConfig::default()),
            Some(dec!(1.10210))
        );
    }

    #[test]
    fn test_not_on_losing_side_of_open() {
        let spec = InstrumentSpec::forex_major("EURUSD");
        let config = TrailingConfig {
            activation_pips: dec!(5),
            distance_pips: dec!(15),
            ..Default::default()
        };
        let pos = position(Side::Buy, dec!(1.10000), dec!(1.09800));
        // +10 pips: candidate would be 5 pips below open
        assert!(next_stop(&pos, dec!(1.10100), &spec, &config).is_none());
    }

    #[test]
    fn test_trails_short_with_broker_minimum() {
        let mut spec = InstrumentSpec::forex_major("EURUSD");
        spec.min_stop_distance_pips = dec!(20);
        let pos = position(Side::Sell, dec!(1.10000), dec!(1.10200));
        // -40 pips for price; distance widened to 20 pips
        assert_eq!(
            next_stop(&pos, dec!(1.09600), &spec, &TrailingConfig::default()),
            Some(dec!(1.09800))
        );
    }
}
