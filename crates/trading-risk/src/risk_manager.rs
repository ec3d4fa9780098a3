//! Unified risk manager.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use trading_core::{
    error::RiskInputError,
    types::{AccountState, InstrumentSpec, Side},
};

use crate::{
    position_sizer::{PositionSizer, RiskAdjustments, Sizing, SizingRequest},
    state::{RiskState, VolatilityRegime},
    stop_loss::{ProtectiveLevels, StopLossCalculator, StopSettings},
};

/// Risk management configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Block new orders above this drawdown from the initial balance
    pub max_drawdown_pct: Decimal,
    /// Block new orders above this loss since the daily anchor
    pub daily_loss_limit_pct: Decimal,
    /// Open positions across all strategies
    pub max_positions: usize,
    /// Upper bound on any strategy's base risk percent
    pub risk_cap_pct: Decimal,
    /// Hard ceiling on money at risk per trade, percent of equity
    pub max_single_trade_risk_pct: Decimal,
    /// Latch the emergency stop above this total loss
    pub emergency_total_loss_pct: Decimal,
    /// Latch the emergency stop above this daily loss
    pub emergency_daily_loss_pct: Decimal,
    /// Volume ceiling, further capped by the instrument maximum
    pub max_safe_lot: Decimal,
    pub risk_reward_ratio: Decimal,
    pub min_take_profit_pips: Decimal,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_drawdown_pct: dec!(20),
            daily_loss_limit_pct: dec!(5),
            max_positions: 10,
            risk_cap_pct: dec!(5),
            max_single_trade_risk_pct: dec!(10),
            emergency_total_loss_pct: dec!(50),
            emergency_daily_loss_pct: dec!(30),
            max_safe_lot: dec!(10),
            risk_reward_ratio: dec!(2),
            min_take_profit_pips: dec!(10),
        }
    }
}

impl RiskConfig {
    pub fn validate(&self) -> Result<(), String> {
        let percent = |name: &str, v: Decimal| {
            if v <= Decimal::ZERO || v > dec!(100) {
                Err(format!("risk.{name} must be within (0, 100], got {v}"))
            } else {
                Ok(())
            }
        };
        percent("max_drawdown_pct", self.max_drawdown_pct)?;
        percent("daily_loss_limit_pct", self.daily_loss_limit_pct)?;
        percent("risk_cap_pct", self.risk_cap_pct)?;
        percent("max_single_trade_risk_pct", self.max_single_trade_risk_pct)?;
        percent("emergency_total_loss_pct", self.emergency_total_loss_pct)?;
        percent("emergency_daily_loss_pct", self.emergency_daily_loss_pct)?;

        if self.max_positions == 0 {
            return Err("risk.max_positions must be at least 1".into());
        }
        if self.max_safe_lot <= Decimal::ZERO {
            return Err("risk.max_safe_lot must be positive".into());
        }
        if self.risk_reward_ratio <= Decimal::ZERO {
            return Err("risk.risk_reward_ratio must be positive".into());
        }
        if self.min_take_profit_pips < Decimal::ZERO {
            return Err("risk.min_take_profit_pips must not be negative".into());
        }
        Ok(())
    }
}

/// Why the gate refuses new orders.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
pub enum RiskBlock {
    #[error("emergency stop active")]
    EmergencyStop,

    #[error("drawdown {current}% exceeds {max}%")]
    Drawdown { current: Decimal, max: Decimal },

    #[error("daily loss {current}% exceeds {limit}%")]
    DailyLoss { current: Decimal, limit: Decimal },

    #[error("{open} open positions, limit {max}")]
    MaxPositions { open: usize, max: usize },
}

/// Why the emergency stop latched.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
pub enum EmergencyCause {
    #[error("total loss {loss_pct}% exceeds hard limit {limit}%")]
    TotalLoss { loss_pct: Decimal, limit: Decimal },

    #[error("daily loss {loss_pct}% exceeds hard limit {limit}%")]
    DailyLoss { loss_pct: Decimal, limit: Decimal },
}

/// Owns [`RiskState`] and every decision that reads it.
pub struct RiskManager {
    config: RiskConfig,
    state: RiskState,
    position_sizer: PositionSizer,
    stop_loss: StopLossCalculator,
}

impl RiskManager {
    /// Create a new risk manager.
    pub fn new(config: RiskConfig) -> Self {
        let position_sizer = PositionSizer::new(
            config.risk_cap_pct,
            config.max_single_trade_risk_pct,
            config.max_safe_lot,
        );
        let stop_loss = StopLossCalculator::new(config.risk_reward_ratio, config.min_take_profit_pips);
        Self {
            config,
            state: RiskState::default(),
            position_sizer,
            stop_loss,
        }
    }

    /// Get the current configuration.
    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn state(&self) -> &RiskState {
        &self.state
    }

    /// Apply new thresholds; the state (streaks, anchors, latch) is kept.
    pub fn update_config(&mut self, config: RiskConfig) {
        self.position_sizer = PositionSizer::new(
            config.risk_cap_pct,
            config.max_single_trade_risk_pct,
            config.max_safe_lot,
        );
        self.stop_loss = StopLossCalculator::new(config.risk_reward_ratio, config.min_take_profit_pips);
        self.config = config;
    }

    /// Recompute drawdown and daily loss from `account` and evaluate the emergency
    /// stop. Returns the cause when the stop latched on this call.
    pub fn refresh(&mut self, account: &AccountState, now: DateTime<Utc>) -> Option<EmergencyCause> {
        let needs_anchor = match self.state.daily_anchor_time {
            None => true,
            Some(anchor) => now.date_naive() > anchor.date_naive(),
        };
        if needs_anchor {
            debug!(equity = %account.equity, "Daily equity anchor reset");
            self.state.daily_anchor_equity = account.equity;
            self.state.daily_anchor_time = Some(now);
        }

        self.state.equity = account.equity;
        self.state.current_drawdown_pct = account.total_loss_pct();
        self.state.daily_loss_pct = if self.state.daily_anchor_equity > Decimal::ZERO {
            ((self.state.daily_anchor_equity - account.equity) / self.state.daily_anchor_equity
                * dec!(100))
            .max(Decimal::ZERO)
        } else {
            Decimal::ZERO
        };

        if self.state.emergency_stop_active {
            return None;
        }

        let cause = if self.state.current_drawdown_pct > self.config.emergency_total_loss_pct {
            Some(EmergencyCause::TotalLoss {
                loss_pct: self.state.current_drawdown_pct,
                limit: self.config.emergency_total_loss_pct,
            })
        } else if self.state.daily_loss_pct > self.config.emergency_daily_loss_pct {
            Some(EmergencyCause::DailyLoss {
                loss_pct: self.state.daily_loss_pct,
                limit: self.config.emergency_daily_loss_pct,
            })
        } else {
            None
        };

        if let Some(cause) = &cause {
            error!(%cause, "Emergency stop activated");
            self.state.emergency_stop_active = true;
            self.state.emergency_reason = Some(cause.to_string());
        }
        cause
    }

    /// First reason new orders are refused, if any.
    pub fn check_gate(&self) -> Result<(), RiskBlock> {
        let s = &self.state;
        if s.emergency_stop_active {
            return Err(RiskBlock::EmergencyStop);
        }
        if s.current_drawdown_pct > self.config.max_drawdown_pct {
            return Err(RiskBlock::Drawdown {
                current: s.current_drawdown_pct,
                max: self.config.max_drawdown_pct,
            });
        }
        if s.daily_loss_pct > self.config.daily_loss_limit_pct {
            return Err(RiskBlock::DailyLoss {
                current: s.daily_loss_pct,
                limit: self.config.daily_loss_limit_pct,
            });
        }
        if s.open_positions >= self.config.max_positions {
            return Err(RiskBlock::MaxPositions {
                open: s.open_positions,
                max: self.config.max_positions,
            });
        }
        Ok(())
    }

    pub fn is_trade_allowed(&self) -> bool {
        self.check_gate().is_ok()
    }

    /// Record the position manager's open position count.
    pub fn sync_open_positions(&mut self, count: usize) {
        self.state.open_positions = count;
    }

    /// Size an order for `instrument`.
    pub fn calculate_position_size(
        &self,
        strategy: &str,
        base_risk_percent: Decimal,
        confidence: f64,
        stop_loss_distance: Decimal,
        size_multiplier: Decimal,
        instrument: &InstrumentSpec,
    ) -> Result<Sizing, RiskInputError> {
        let request = SizingRequest {
            equity: self.state.equity,
            base_risk_percent,
            confidence,
            stop_loss_distance,
            size_multiplier,
            adjustments: RiskAdjustments {
                win_multiplier: self.state.win_multiplier,
                loss_divisor: self.state.loss_divisor,
                volatility_multiplier: self.state.volatility_multiplier(&instrument.symbol),
            },
        };
        let sizing = self.position_sizer.calculate(&request, instrument)?;
        debug!(
            strategy,
            instrument = %instrument.symbol,
            risk = %sizing.risk_amount,
            raw = %sizing.raw_volume,
            volume = %sizing.volume,
            "Position sized"
        );
        Ok(sizing)
    }

    /// Minimum lot for `instrument`, the fallback volume on invalid sizing inputs.
    pub fn fallback_volume(&self, instrument: &InstrumentSpec) -> Decimal {
        instrument.min_lot
    }

    /// ATR-scaled stop and risk:reward take-profit for a new order.
    pub fn protective_levels(
        &self,
        side: Side,
        entry: Decimal,
        atr: f64,
        settings: &StopSettings,
        instrument: &InstrumentSpec,
    ) -> Result<ProtectiveLevels, RiskInputError> {
        self.stop_loss
            .protective_levels(side, entry, atr, settings, instrument)
    }

    pub fn calculate_dynamic_stop_loss(
        &self,
        side: Side,
        entry: Decimal,
        atr: f64,
        base_pips: Decimal,
        atr_multiplier: Decimal,
        instrument: &InstrumentSpec,
    ) -> Result<Decimal, RiskInputError> {
        self.stop_loss
            .calculate_dynamic_stop_loss(side, entry, atr, base_pips, atr_multiplier, instrument)
    }

    pub fn calculate_dynamic_take_profit(
        &self,
        side: Side,
        entry: Decimal,
        stop_distance: Decimal,
        risk_reward: Option<Decimal>,
        instrument: &InstrumentSpec,
    ) -> Result<Decimal, RiskInputError> {
        self.stop_loss
            .calculate_dynamic_take_profit(side, entry, stop_distance, risk_reward, instrument)
    }

    /// Update win/loss streaks and the multipliers derived from them.
    pub fn record_trade_result(&mut self, is_win: bool) {
        let s = &mut self.state;
        if is_win {
            s.consecutive_wins += 1;
            s.consecutive_losses = 0;
            s.win_multiplier =
                (Decimal::ONE + dec!(0.1) * Decimal::from(s.consecutive_wins)).min(dec!(2));
            s.loss_divisor = Decimal::ONE;
        } else {
            s.consecutive_losses += 1;
            s.consecutive_wins = 0;
            s.loss_divisor =
                (Decimal::ONE + dec!(0.2) * Decimal::from(s.consecutive_losses)).min(dec!(3));
            s.win_multiplier = Decimal::ONE;
        }
        info!(
            is_win,
            wins = s.consecutive_wins,
            losses = s.consecutive_losses,
            win_multiplier = %s.win_multiplier,
            loss_divisor = %s.loss_divisor,
            "Trade result recorded"
        );
    }

    /// Fold an ATR sample into `instrument`'s baseline. Non-finite and
    /// non-positive samples are ignored.
    pub fn update_volatility_multiplier(&mut self, instrument: &str, current_atr: f64) {
        if !(current_atr.is_finite() && current_atr > 0.0) {
            return;
        }
        match self.state.volatility.get_mut(instrument) {
            Some(regime) => {
                let before = regime.multiplier;
                regime.update(current_atr);
                if regime.multiplier != before {
                    debug!(instrument, multiplier = %regime.multiplier, "Volatility regime changed");
                }
            }
            None => {
                self.state
                    .volatility
                    .insert(instrument.to_string(), VolatilityRegime::seeded(current_atr));
            }
        }
    }

    pub fn is_emergency_stop(&self) -> bool {
        self.state.emergency_stop_active
    }

    /// Operator action clearing the emergency latch. The next refresh latches
    /// again if the loss condition still holds.
    pub fn reset_emergency_stop(&mut self) {
        if self.state.emergency_stop_active {
            warn!(reason = ?self.state.emergency_reason, "Emergency stop reset by operator");
        }
        self.state.emergency_stop_active = false;
        self.state.emergency_reason = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn account(initial: Decimal, equity: Decimal) -> AccountState {
        AccountState {
            balance: equity,
            equity,
            free_margin: equity,
            leverage: dec!(100),
            initial_balance: initial,
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_drawdown_blocks_trading() {
        let mut manager = RiskManager::new(RiskConfig::default());
        manager.refresh(&account(dec!(10000), dec!(7500)), t0());

        assert_eq!(manager.state().current_drawdown_pct, dec!(25));
        assert!(!manager.is_trade_allowed());
        assert!(matches!(manager.check_gate(), Err(RiskBlock::Drawdown { .. })));
    }

    #[test]
    fn test_position_limit_blocks_trading() {
        let mut manager = RiskManager::new(RiskConfig {
            max_positions: 2,
            ..Default::default()
        });
        manager.refresh(&account(dec!(10000), dec!(10000)), t0());
        manager.sync_open_positions(1);
        assert!(manager.is_trade_allowed());
        manager.sync_open_positions(2);
        assert_eq!(
            manager.check_gate(),
            Err(RiskBlock::MaxPositions { open: 2, max: 2 })
        );
    }

    #[test]
    fn test_daily_anchor_resets_once_per_day() {
        let mut manager = RiskManager::new(RiskConfig::default());
        manager.refresh(&account(dec!(10000), dec!(10000)), t0());
        manager.refresh(&account(dec!(10000), dec!(9400)), t0() + Duration::hours(2));

        assert_eq!(manager.state().daily_loss_pct, dec!(6));
        assert!(matches!(manager.check_gate(), Err(RiskBlock::DailyLoss { .. })));

        // Same day: anchor stays
        manager.refresh(&account(dec!(10000), dec!(9500)), t0() + Duration::hours(5));
        assert_eq!(manager.state().daily_anchor_equity, dec!(10000));

        // Next UTC day: anchor moves to current equity
        let next_day = Utc.with_ymd_and_hms(2024, 3, 5, 0, 1, 0).unwrap();
        manager.refresh(&account(dec!(10000), dec!(9500)), next_day);
        assert_eq!(manager.state().daily_anchor_equity, dec!(9500));
        assert_eq!(manager.state().daily_loss_pct, Decimal::ZERO);
        assert!(manager.is_trade_allowed());
    }

    #[test]
    fn test_daily_loss_never_negative() {
        let mut manager = RiskManager::new(RiskConfig::default());
        manager.refresh(&account(dec!(10000), dec!(10000)), t0());
        manager.refresh(&account(dec!(10000), dec!(11000)), t0() + Duration::hours(1));
        assert_eq!(manager.state().daily_loss_pct, Decimal::ZERO);
    }

    #[test]
    fn test_emergency_stop_latches_until_reset() {
        let mut manager = RiskManager::new(RiskConfig::default());
        let cause = manager.refresh(&account(dec!(10000), dec!(4900)), t0());
        assert!(matches!(cause, Some(EmergencyCause::TotalLoss { .. })));
        assert!(manager.is_emergency_stop());

        // Recovery does not clear it
        assert!(manager
            .refresh(&account(dec!(10000), dec!(9900)), t0() + Duration::minutes(5))
            .is_none());
        assert!(manager.is_emergency_stop());
        assert_eq!(manager.check_gate(), Err(RiskBlock::EmergencyStop));

        manager.reset_emergency_stop();
        assert!(!manager.is_emergency_stop());
        assert!(manager.is_trade_allowed());
    }

    #[test]
    fn test_emergency_on_daily_loss() {
        let mut manager = RiskManager::new(RiskConfig::default());
        manager.refresh(&account(dec!(10000), dec!(20000)), t0());
        let cause = manager.refresh(&account(dec!(10000), dec!(13000)), t0() + Duration::hours(1));
        assert!(matches!(cause, Some(EmergencyCause::DailyLoss { .. })));
    }

    #[test]
    fn test_streaks() {
        let mut manager = RiskManager::new(RiskConfig::default());
        for _ in 0..5 {
            manager.record_trade_result(true);
        }
        assert_eq!(manager.state().win_multiplier, dec!(1.5));

        manager.record_trade_result(false);
        let s = manager.state();
        assert_eq!(s.consecutive_wins, 0);
        assert_eq!(s.win_multiplier, Decimal::ONE);
        assert_eq!(s.loss_divisor, dec!(1.2));

        for _ in 0..20 {
            manager.record_trade_result(false);
        }
        assert_eq!(manager.state().loss_divisor, dec!(3));
    }

    #[test]
    fn test_win_multiplier_caps_at_two() {
        let mut manager = RiskManager::new(RiskConfig::default());
        for _ in 0..15 {
            manager.record_trade_result(true);
        }
        assert_eq!(manager.state().win_multiplier, dec!(2));
    }

    #[test]
    fn test_sizing_uses_streak_and_volatility() {
        let mut manager = RiskManager::new(RiskConfig::default());
        manager.refresh(&account(dec!(10000), dec!(10000)), t0());
        let spec = InstrumentSpec::forex_major("EURUSD");

        let base = manager
            .calculate_position_size("s", dec!(1), 100.0, dec!(0.0020), Decimal::ONE, &spec)
            .unwrap();
        assert_eq!(base.risk_amount, dec!(100));

        manager.record_trade_result(false);
        let after_loss = manager
            .calculate_position_size("s", dec!(1), 100.0, dec!(0.0020), Decimal::ONE, &spec)
            .unwrap();
        assert!(after_loss.risk_amount < base.risk_amount);

        manager.update_volatility_multiplier("EURUSD", 0.0010);
        manager.update_volatility_multiplier("EURUSD", 0.0100);
        assert_eq!(manager.state().volatility_multiplier("EURUSD"), dec!(0.7));
        assert_eq!(manager.state().volatility_multiplier("GBPUSD"), Decimal::ONE);
    }

    #[test]
    fn test_volatility_ignores_bad_samples() {
        let mut manager = RiskManager::new(RiskConfig::default());
        manager.update_volatility_multiplier("EURUSD", f64::NAN);
        manager.update_volatility_multiplier("EURUSD", 0.0);
        assert!(manager.state().baseline_volatility("EURUSD").is_none());

        manager.update_volatility_multiplier("EURUSD", 0.0012);
        assert_eq!(manager.state().baseline_volatility("EURUSD"), Some(0.0012));
    }

    #[test]
    fn test_config_validation() {
        assert!(RiskConfig::default().validate().is_ok());
        let bad = RiskConfig {
            max_drawdown_pct: dec!(0),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
