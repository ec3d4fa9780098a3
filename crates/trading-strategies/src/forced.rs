//! Forced signal generation.
//!
//! A stress/test mode that emits a random-direction signal when no rule-based
//! strategy placed an order for an instrument. Off by default and capped by a
//! per-bar probability, a minimum interval and a daily limit. Every signal it
//! produces carries the `forced` label.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;
use trading_core::{
    error::StrategyError,
    types::{IndicatorSnapshot, Side, Signal},
};

use crate::config::{RiskProfile, MAX_MINUTES};

/// Configuration for the forced signal path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForcedSignalConfig {
    pub enabled: bool,
    /// Chance of firing on an eligible bar, `[0, 1]`
    pub probability: f64,
    pub min_interval_minutes: u64,
    pub max_per_day: u32,
    pub confidence: f64,
    /// Tag attached to forced orders
    pub strategy_name: String,
    pub base_risk_percent: Decimal,
    pub max_positions: usize,
    pub atr_multiplier: Decimal,
    pub stop_loss_pips: Decimal,
    pub risk_reward: Option<Decimal>,
    pub max_hold_minutes: Option<u64>,
    /// Fixed RNG seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for ForcedSignalConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            probability: 0.05,
            min_interval_minutes: 60,
            max_per_day: 3,
            confidence: 50.0,
            strategy_name: "forced".to_string(),
            base_risk_percent: dec!(0.25),
            max_positions: 1,
            atr_multiplier: dec!(1.5),
            stop_loss_pips: dec!(20),
            risk_reward: None,
            max_hold_minutes: Some(240),
            seed: None,
        }
    }
}

impl ForcedSignalConfig {
    pub fn risk_profile(&self) -> RiskProfile {
        RiskProfile {
            base_risk_percent: self.base_risk_percent,
            atr_multiplier: self.atr_multiplier,
            stop_loss_pips: self.stop_loss_pips,
            risk_reward: self.risk_reward,
            max_hold_minutes: self.max_hold_minutes,
        }
    }

    pub fn validate(&self) -> Result<(), StrategyError> {
        let invalid = |msg: &str| StrategyError::InvalidConfig(format!("forced: {msg}"));

        if !(0.0..=1.0).contains(&self.probability) {
            return Err(invalid("probability must be within [0, 1]"));
        }
        if !(0.0..=100.0).contains(&self.confidence) {
            return Err(invalid("confidence must be within [0, 100]"));
        }
        if self.strategy_name.trim().is_empty() {
            return Err(invalid("strategy_name must not be empty"));
        }
        if self.base_risk_percent <= Decimal::ZERO || self.base_risk_percent > Decimal::ONE_HUNDRED {
            return Err(invalid("base_risk_percent must be within (0, 100]"));
        }
        if self.stop_loss_pips <= Decimal::ZERO {
            return Err(invalid("stop_loss_pips must be positive"));
        }
        if self.atr_multiplier < Decimal::ZERO {
            return Err(invalid("atr_multiplier must not be negative"));
        }
        if self.min_interval_minutes > MAX_MINUTES {
            return Err(invalid("min_interval_minutes must not exceed one year"));
        }
        if self
            .max_hold_minutes
            .is_some_and(|minutes| minutes == 0 || minutes > MAX_MINUTES)
        {
            return Err(invalid("max_hold_minutes must be between 1 minute and one year"));
        }
        if self.enabled && (self.max_per_day == 0 || self.max_positions == 0) {
            return Err(invalid("max_per_day and max_positions must be at least 1 when enabled"));
        }
        Ok(())
    }
}

/// Seeded random signal source with frequency caps.
pub struct ForcedSignalGenerator {
    config: ForcedSignalConfig,
    rng: StdRng,
    last_fired: Option<DateTime<Utc>>,
    day: Option<NaiveDate>,
    fired_today: u32,
}

impl ForcedSignalGenerator {
    /// Seed from the config, or from OS entropy when no seed is set.
    pub fn new(config: ForcedSignalConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }

    pub fn with_rng(config: ForcedSignalConfig, rng: StdRng) -> Self {
        Self {
            config,
            rng,
            last_fired: None,
            day: None,
            fired_today: 0,
        }
    }

    pub fn config(&self) -> &ForcedSignalConfig {
        &self.config
    }

    /// Swap settings, keeping the RNG and frequency counters.
    pub fn update_config(&mut self, config: ForcedSignalConfig) {
        self.config = config;
    }

    pub fn fired_today(&self) -> u32 {
        self.fired_today
    }

    /// Roll for a forced signal on `snapshot`'s instrument.
    pub fn try_generate(
        &mut self,
        snapshot: &IndicatorSnapshot,
        now: DateTime<Utc>,
    ) -> Option<Signal> {
        if !self.config.enabled {
            return None;
        }

        let today = now.date_naive();
        if self.day != Some(today) {
            self.day = Some(today);
            self.fired_today = 0;
        }
        if self.fired_today >= self.config.max_per_day {
            return None;
        }

        if let Some(last) = self.last_fired {
            let min_interval = i64::try_from(self.config.min_interval_minutes)
                .ok()
                .and_then(Duration::try_minutes);
            // An interval too large to represent never elapses
            if min_interval.map_or(true, |interval| now - last < interval) {
                return None;
            }
        }

        if !self.rng.gen_bool(self.config.probability.clamp(0.0, 1.0)) {
            return None;
        }

        let side = if self.rng.gen_bool(0.5) {
            Side::Buy
        } else {
            Side::Sell
        };
        self.last_fired = Some(now);
        self.fired_today += 1;
        debug!(instrument = %snapshot.instrument, %side, fired_today = self.fired_today, "Forced signal drawn");

        Some(
            Signal::new(
                &self.config.strategy_name,
                &snapshot.instrument,
                side,
                self.config.confidence,
                now,
            )
            .with_reason("forced signal (test mode)")
            .into_forced(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn always() -> ForcedSignalConfig {
        ForcedSignalConfig {
            enabled: true,
            probability: 1.0,
            min_interval_minutes: 30,
            max_per_day: 2,
            seed: Some(7),
            ..Default::default()
        }
    }

    fn snapshot() -> IndicatorSnapshot {
        IndicatorSnapshot::new("EURUSD", Utc::now(), 0.0001)
    }

    #[test]
    fn test_disabled_by_default() {
        let mut generator = ForcedSignalGenerator::new(ForcedSignalConfig::default());
        assert!(!generator.config().enabled);
        assert!(generator.try_generate(&snapshot(), Utc::now()).is_none());
    }

    #[test]
    fn test_interval_and_daily_cap() {
        let mut generator = ForcedSignalGenerator::new(always());
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();

        let first = generator.try_generate(&snapshot(), t0).unwrap();
        assert!(first.forced);
        assert_eq!(first.strategy, "forced");

        assert!(generator
            .try_generate(&snapshot(), t0 + Duration::minutes(10))
            .is_none());
        assert!(generator
            .try_generate(&snapshot(), t0 + Duration::minutes(30))
            .is_some());
        // Daily cap of two reached
        assert!(generator
            .try_generate(&snapshot(), t0 + Duration::hours(3))
            .is_none());

        // New UTC day resets the cap
        let next_day = Utc.with_ymd_and_hms(2024, 5, 2, 0, 5, 0).unwrap();
        assert!(generator.try_generate(&snapshot(), next_day).is_some());
    }

    #[test]
    fn test_zero_probability_never_fires() {
        let config = ForcedSignalConfig {
            probability: 0.0,
            ..always()
        };
        let mut generator = ForcedSignalGenerator::new(config);
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        for i in 0..100 {
            assert!(generator
                .try_generate(&snapshot(), t0 + Duration::hours(i))
                .is_none());
        }
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let config = ForcedSignalConfig {
            probability: 0.5,
            min_interval_minutes: 0,
            max_per_day: 1000,
            ..always()
        };
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let run = |config: ForcedSignalConfig| {
            let mut generator = ForcedSignalGenerator::new(config);
            (0..50)
                .map(|i| {
                    generator
                        .try_generate(&snapshot(), t0 + Duration::minutes(i))
                        .map(|s| s.side)
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(run(config.clone()), run(config));
    }

    #[test]
    fn test_validation() {
        assert!(ForcedSignalConfig::default().validate().is_ok());
        let bad = ForcedSignalConfig {
            probability: 1.5,
            ..Default::default()
        };
        assert!(bad.validate().is_err());

        let bad = ForcedSignalConfig {
            min_interval_minutes: u64::MAX,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let bad = ForcedSignalConfig {
            max_hold_minutes: Some(MAX_MINUTES + 1),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_unrepresentable_interval_never_elapses() {
        let config = ForcedSignalConfig {
            min_interval_minutes: u64::MAX,
            ..always()
        };
        let mut generator = ForcedSignalGenerator::new(config);
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();

        assert!(generator.try_generate(&snapshot(), t0).is_some());
        assert!(generator
            .try_generate(&snapshot(), t0 + Duration::hours(6))
            .is_none());
    }
}
