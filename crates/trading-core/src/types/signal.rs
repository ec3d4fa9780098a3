//! Trading signals produced by strategies.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Side;

/// Directional signal with a confidence score in `[0, 100]`.
///
/// Signals live for a single tick: produced by a generator, sized by the risk
/// manager, and dropped once the order attempt is made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Name of the strategy that produced the signal
    pub strategy: String,
    /// Instrument the signal applies to
    pub instrument: String,
    pub side: Side,
    /// Confidence score, always within `[0, 100]`
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
    /// Human-readable trigger description
    pub reason: String,
    /// Volume scale applied after sizing (grid levels use `multiplier^k`)
    pub size_multiplier: Decimal,
    /// Set only by the forced-signal generator
    pub forced: bool,
}

impl Signal {
    /// Create a signal; confidence is clamped into `[0, 100]` and NaN becomes 0.
    pub fn new(
        strategy: impl Into<String>,
        instrument: impl Into<String>,
        side: Side,
        confidence: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            strategy: strategy.into(),
            instrument: instrument.into(),
            side,
            confidence: clamp_confidence(confidence),
            timestamp,
            reason: String::new(),
            size_multiplier: Decimal::ONE,
            forced: false,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn with_size_multiplier(mut self, multiplier: Decimal) -> Self {
        self.size_multiplier = multiplier;
        self
    }

    /// Label the signal as coming from the forced-signal path.
    pub fn into_forced(mut self) -> Self {
        self.forced = true;
        self
    }
}

/// Clamp a confidence score into `[0, 100]`; NaN maps to 0.
pub fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_is_clamped() {
        let now = Utc::now();
        assert_eq!(Signal::new("s", "X", Side::Buy, 130.0, now).confidence, 100.0);
        assert_eq!(Signal::new("s", "X", Side::Buy, -5.0, now).confidence, 0.0);
        assert_eq!(Signal::new("s", "X", Side::Buy, f64::NAN, now).confidence, 0.0);
        assert_eq!(Signal::new("s", "X", Side::Sell, 64.5, now).confidence, 64.5);
    }

    #[test]
    fn test_defaults() {
        let signal = Signal::new("grid", "EURUSD", Side::Buy, 70.0, Utc::now());
        assert_eq!(signal.size_multiplier, Decimal::ONE);
        assert!(!signal.forced);
        assert!(signal.into_forced().forced);
    }
}
