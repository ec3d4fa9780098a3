//! Partial-close and time-exit rules.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use trading_core::types::{InstrumentSpec, Position};

/// Partial close configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialCloseConfig {
    pub enabled: bool,
    /// Profit in pips that triggers the partial close
    pub trigger_pips: Decimal,
    /// Share of volume to close, percent
    pub close_percent: Decimal,
}

impl Default for PartialCloseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            trigger_pips: dec!(30),
            close_percent: dec!(50),
        }
    }
}

impl PartialCloseConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.trigger_pips < Decimal::ZERO {
            return Err("partial_close.trigger_pips must not be negative".into());
        }
        if self.close_percent <= Decimal::ZERO || self.close_percent >= dec!(100) {
            return Err("partial_close.close_percent must be within (0, 100)".into());
        }
        Ok(())
    }
}

/// What to do about a partial close this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PartialClose {
    /// Nothing to do
    Skip,
    /// Close this volume
    Close { volume: Decimal },
    /// Trigger reached but the position cannot be split; mark it anyway
    MarkOnly,
}

/// Decide the partial close for `position` at `profit_pips`.
pub fn partial_close(
    position: &Position,
    profit_pips: Decimal,
    instrument: &InstrumentSpec,
    config: &PartialCloseConfig,
) -> PartialClose {
    if !config.enabled || position.partially_closed || profit_pips < config.trigger_pips {
        return PartialClose::Skip;
    }

    let volume = instrument.floor_volume(position.volume * config.close_percent / dec!(100));
    let remainder = position.volume - volume;
    if volume < instrument.min_lot || remainder < instrument.min_lot {
        return PartialClose::MarkOnly;
    }
    PartialClose::Close { volume }
}

/// Whether `position` has been held longer than `max_hold_minutes`.
///
/// A limit too large for a [`Duration`] never expires.
pub fn hold_expired(position: &Position, now: DateTime<Utc>, max_hold_minutes: Option<u64>) -> bool {
    max_hold_minutes
        .and_then(|minutes| i64::try_from(minutes).ok())
        .and_then(Duration::try_minutes)
        .is_some_and(|limit| now - position.open_time > limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use trading_core::types::{OrderRequest, PositionId, Side};

    fn position(volume: Decimal) -> Position {
        let request = OrderRequest::market("EURUSD", Side::Buy, volume, dec!(1.1));
        Position::opening(PositionId::new(), &request, Utc::now())
    }

    #[test]
    fn test_partial_close_splits_on_lot_grid() {
        let spec = InstrumentSpec::forex_major("EURUSD");
        let config = PartialCloseConfig::default();
        assert_eq!(
            partial_close(&position(dec!(0.15)), dec!(35), &spec, &config),
            PartialClose::Close { volume: dec!(0.07) }
        );
        assert_eq!(
            partial_close(&position(dec!(0.15)), dec!(20), &spec, &config),
            PartialClose::Skip
        );
    }

    #[test]
    fn test_too_small_to_split_is_marked() {
        let spec = InstrumentSpec::forex_major("EURUSD");
        assert_eq!(
            partial_close(&position(dec!(0.01)), dec!(50), &spec, &PartialCloseConfig::default()),
            PartialClose::MarkOnly
        );
    }

    #[test]
    fn test_at_most_once() {
        let spec = InstrumentSpec::forex_major("EURUSD");
        let mut pos = position(dec!(1));
        pos.partially_closed = true;
        assert_eq!(
            partial_close(&pos, dec!(100), &spec, &PartialCloseConfig::default()),
            PartialClose::Skip
        );
    }

    #[test]
    fn test_hold_expired() {
        let pos = position(dec!(1));
        let later = pos.open_time + Duration::minutes(61);
        assert!(hold_expired(&pos, later, Some(60)));
        assert!(!hold_expired(&pos, later, Some(90)));
        assert!(!hold_expired(&pos, later, None));
    }

    #[test]
    fn test_huge_hold_limit_never_expires() {
        let pos = position(dec!(1));
        let later = pos.open_time + Duration::minutes(1);
        assert!(!hold_expired(&pos, later, Some(u64::MAX)));
        assert!(!hold_expired(&pos, later, Some(1 << 50)));
        assert!(!hold_expired(&pos, later, Some(i64::MAX as u64)));
    }
}
