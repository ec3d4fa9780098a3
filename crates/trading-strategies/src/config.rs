//! Strategy configuration.

use chrono::NaiveTime;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use trading_core::error::StrategyError;

/// Kinds of rule-based signal generators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    ExtremeReversal,
    VolatilityBreakout,
    MomentumCrossover,
    NewsEvent,
    GridRecovery,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::ExtremeReversal,
        StrategyKind::VolatilityBreakout,
        StrategyKind::MomentumCrossover,
        StrategyKind::NewsEvent,
        StrategyKind::GridRecovery,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::ExtremeReversal => "extreme_reversal",
            StrategyKind::VolatilityBreakout => "volatility_breakout",
            StrategyKind::MomentumCrossover => "momentum_crossover",
            StrategyKind::NewsEvent => "news_event",
            StrategyKind::GridRecovery => "grid_recovery",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            StrategyKind::ExtremeReversal => {
                "Edge-triggered fast RSI reversal at extreme oversold/overbought levels"
            }
            StrategyKind::VolatilityBreakout => {
                "Trades ATR expansion against its trailing average in the direction of the last move"
            }
            StrategyKind::MomentumCrossover => {
                "MACD/signal crossover with minimum separation and optional trend filters"
            }
            StrategyKind::NewsEvent => {
                "Volatility breakout restricted to configured UTC event windows"
            }
            StrategyKind::GridRecovery => {
                "Counter-move grid around an anchor price with geometric level sizing"
            }
        }
    }

    /// Default parameters for this kind.
    pub fn default_params(&self) -> StrategyParams {
        match self {
            StrategyKind::ExtremeReversal => {
                StrategyParams::ExtremeReversal(ExtremeReversalParams::default())
            }
            StrategyKind::VolatilityBreakout => {
                StrategyParams::VolatilityBreakout(VolatilityBreakoutParams::default())
            }
            StrategyKind::MomentumCrossover => {
                StrategyParams::MomentumCrossover(MomentumCrossoverParams::default())
            }
            StrategyKind::NewsEvent => StrategyParams::NewsEvent(NewsEventParams::default()),
            StrategyKind::GridRecovery => {
                StrategyParams::GridRecovery(GridRecoveryParams::default())
            }
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extreme oscillator reversal thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtremeReversalParams {
    /// Buy when fast RSI drops below this level
    pub oversold: f64,
    /// Sell when fast RSI rises above this level
    pub overbought: f64,
    pub base_confidence: f64,
    /// Confidence added per RSI point past the threshold
    pub confidence_per_point: f64,
}

impl Default for ExtremeReversalParams {
    fn default() -> Self {
        Self {
            oversold: 10.0,
            overbought: 90.0,
            base_confidence: 90.0,
            confidence_per_point: 2.0,
        }
    }
}

/// ATR expansion breakout thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolatilityBreakoutParams {
    /// Number of prior ATR samples averaged for the baseline
    pub lookback: usize,
    /// Minimum `atr[0] / mean(atr[1..=lookback])`
    pub breakout_ratio: f64,
    pub base_confidence: f64,
    /// Confidence added per unit of ratio above the threshold
    pub confidence_per_ratio: f64,
}

impl Default for VolatilityBreakoutParams {
    fn default() -> Self {
        Self {
            lookback: 20,
            breakout_ratio: 1.5,
            base_confidence: 60.0,
            confidence_per_ratio: 20.0,
        }
    }
}

/// MACD crossover thresholds and optional filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumCrossoverParams {
    /// Minimum |main - signal| after the cross, in pips
    pub min_separation_pips: f64,
    pub base_confidence: f64,
    /// Confidence added per pip of separation
    pub confidence_per_pip: f64,
    /// Require fast EMA above slow EMA for buys (below for sells)
    pub require_trend: bool,
    /// Minimum ADX, when set
    pub min_adx: Option<f64>,
    /// Require price on the signal side of the higher-timeframe EMA when available
    pub use_higher_timeframe: bool,
}

impl Default for MomentumCrossoverParams {
    fn default() -> Self {
        Self {
            min_separation_pips: 0.5,
            base_confidence: 65.0,
            confidence_per_pip: 5.0,
            require_trend: true,
            min_adx: None,
            use_higher_timeframe: true,
        }
    }
}

/// A UTC time-of-day window, `[start, end)`. Wraps midnight when `end < start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start <= self.end {
            time >= self.start && time < self.end
        } else {
            time >= self.start || time < self.end
        }
    }
}

/// High-impact event trading thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsEventParams {
    pub windows: Vec<TimeWindow>,
    pub lookback: usize,
    /// Must exceed every configured breakout ratio
    pub breakout_ratio: f64,
    pub base_confidence: f64,
    pub confidence_per_ratio: f64,
}

impl Default for NewsEventParams {
    fn default() -> Self {
        let at = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN);
        Self {
            // London open and US data releases
            windows: vec![
                TimeWindow::new(at(7, 55), at(8, 30)),
                TimeWindow::new(at(12, 25), at(13, 0)),
            ],
            lookback: 20,
            breakout_ratio: 2.0,
            base_confidence: 80.0,
            confidence_per_ratio: 10.0,
        }
    }
}

/// Upper bound for minute-valued settings: one year.
pub const MAX_MINUTES: u64 = 525_600;

/// Upper bound for `GridRecoveryParams::max_levels`.
pub const MAX_GRID_LEVELS: u32 = 20;

/// Upper bound for `GridRecoveryParams::multiplier`.
pub const MAX_GRID_MULTIPLIER: Decimal = dec!(10);

/// Grid/recovery geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridRecoveryParams {
    /// Distance between levels, in pips
    pub spacing_pips: f64,
    pub max_levels: u32,
    /// Volume scale per level; level k trades `multiplier^k`
    pub multiplier: Decimal,
    pub confidence: f64,
}

impl Default for GridRecoveryParams {
    fn default() -> Self {
        Self {
            spacing_pips: 20.0,
            max_levels: 5,
            multiplier: dec!(1.5),
            confidence: 70.0,
        }
    }
}

/// Strategy-specific parameters, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyParams {
    ExtremeReversal(ExtremeReversalParams),
    VolatilityBreakout(VolatilityBreakoutParams),
    MomentumCrossover(MomentumCrossoverParams),
    NewsEvent(NewsEventParams),
    GridRecovery(GridRecoveryParams),
}

impl StrategyParams {
    pub fn kind(&self) -> StrategyKind {
        match self {
            StrategyParams::ExtremeReversal(_) => StrategyKind::ExtremeReversal,
            StrategyParams::VolatilityBreakout(_) => StrategyKind::VolatilityBreakout,
            StrategyParams::MomentumCrossover(_) => StrategyKind::MomentumCrossover,
            StrategyParams::NewsEvent(_) => StrategyKind::NewsEvent,
            StrategyParams::GridRecovery(_) => StrategyKind::GridRecovery,
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            StrategyParams::ExtremeReversal(p) => {
                check_percent("oversold", p.oversold)?;
                check_percent("overbought", p.overbought)?;
                if p.oversold >= p.overbought {
                    return Err("oversold must be below overbought".into());
                }
                check_percent("base_confidence", p.base_confidence)?;
                check_non_negative("confidence_per_point", p.confidence_per_point)
            }
            StrategyParams::VolatilityBreakout(p) => {
                check_ratio(p.lookback, p.breakout_ratio)?;
                check_percent("base_confidence", p.base_confidence)?;
                check_non_negative("confidence_per_ratio", p.confidence_per_ratio)
            }
            StrategyParams::MomentumCrossover(p) => {
                check_non_negative("min_separation_pips", p.min_separation_pips)?;
                check_percent("base_confidence", p.base_confidence)?;
                check_non_negative("confidence_per_pip", p.confidence_per_pip)?;
                if let Some(adx) = p.min_adx {
                    check_percent("min_adx", adx)?;
                }
                Ok(())
            }
            StrategyParams::NewsEvent(p) => {
                if p.windows.is_empty() {
                    return Err("at least one time window is required".into());
                }
                if p.windows.iter().any(|w| w.start == w.end) {
                    return Err("time windows must not be empty".into());
                }
                check_ratio(p.lookback, p.breakout_ratio)?;
                check_percent("base_confidence", p.base_confidence)?;
                check_non_negative("confidence_per_ratio", p.confidence_per_ratio)
            }
            StrategyParams::GridRecovery(p) => {
                if !(p.spacing_pips.is_finite() && p.spacing_pips > 0.0) {
                    return Err("spacing_pips must be positive".into());
                }
                if p.max_levels == 0 || p.max_levels > MAX_GRID_LEVELS {
                    return Err(format!("max_levels must be within [1, {MAX_GRID_LEVELS}]"));
                }
                if p.multiplier < Decimal::ONE || p.multiplier > MAX_GRID_MULTIPLIER {
                    return Err(format!("multiplier must be within [1, {MAX_GRID_MULTIPLIER}]"));
                }
                check_percent("confidence", p.confidence)
            }
        }
    }
}

fn check_percent(name: &str, value: f64) -> Result<(), String> {
    if !(0.0..=100.0).contains(&value) {
        return Err(format!("{name} must be within [0, 100], got {value}"));
    }
    Ok(())
}

fn check_non_negative(name: &str, value: f64) -> Result<(), String> {
    if !(value.is_finite() && value >= 0.0) {
        return Err(format!("{name} must be a non-negative number, got {value}"));
    }
    Ok(())
}

fn check_ratio(lookback: usize, ratio: f64) -> Result<(), String> {
    if lookback == 0 {
        return Err("lookback must be at least 1".into());
    }
    if !(ratio.is_finite() && ratio > 1.0) {
        return Err(format!("breakout_ratio must be greater than 1, got {ratio}"));
    }
    Ok(())
}

fn default_enabled() -> bool {
    true
}

fn default_priority() -> u32 {
    100
}

fn default_max_positions() -> usize {
    3
}

fn default_atr_multiplier() -> Decimal {
    dec!(1.5)
}

fn default_stop_loss_pips() -> Decimal {
    dec!(20)
}

/// Configuration for one strategy instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Unique name; also the tag attached to submitted orders
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Lower runs first; ties are broken by name
    #[serde(default = "default_priority")]
    pub priority: u32,
    /// Percent of equity risked per trade before adjustments
    pub base_risk_percent: Decimal,
    /// Open positions this strategy may hold
    #[serde(default = "default_max_positions")]
    pub max_positions: usize,
    #[serde(default = "default_atr_multiplier")]
    pub atr_multiplier: Decimal,
    /// Base stop-loss distance, in pips
    #[serde(default = "default_stop_loss_pips")]
    pub stop_loss_pips: Decimal,
    /// Overrides the global risk:reward ratio
    #[serde(default)]
    pub risk_reward: Option<Decimal>,
    /// Close positions held longer than this
    #[serde(default)]
    pub max_hold_minutes: Option<u64>,
    pub params: StrategyParams,
}

impl StrategyConfig {
    /// A config with default risk settings for the given parameters.
    pub fn new(name: impl Into<String>, params: StrategyParams) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            priority: default_priority(),
            base_risk_percent: Decimal::ONE,
            max_positions: default_max_positions(),
            atr_multiplier: default_atr_multiplier(),
            stop_loss_pips: default_stop_loss_pips(),
            risk_reward: None,
            max_hold_minutes: None,
            params,
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_risk(mut self, base_risk_percent: Decimal) -> Self {
        self.base_risk_percent = base_risk_percent;
        self
    }

    pub fn kind(&self) -> StrategyKind {
        self.params.kind()
    }

    /// Sizing and exit settings shared with the forced path.
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
        let invalid = |msg: String| StrategyError::InvalidConfig(format!("{}: {msg}", self.name));

        if self.name.trim().is_empty() {
            return Err(StrategyError::InvalidConfig(
                "strategy name must not be empty".into(),
            ));
        }
        if self.base_risk_percent <= Decimal::ZERO || self.base_risk_percent > Decimal::ONE_HUNDRED
        {
            return Err(invalid(format!(
                "base_risk_percent must be within (0, 100], got {}",
                self.base_risk_percent
            )));
        }
        if self.max_positions == 0 {
            return Err(invalid("max_positions must be at least 1".into()));
        }
        if self.atr_multiplier < Decimal::ZERO {
            return Err(invalid("atr_multiplier must not be negative".into()));
        }
        if self.stop_loss_pips <= Decimal::ZERO {
            return Err(invalid("stop_loss_pips must be positive".into()));
        }
        if self.risk_reward.is_some_and(|rr| rr <= Decimal::ZERO) {
            return Err(invalid("risk_reward must be positive".into()));
        }
        if self
            .max_hold_minutes
            .is_some_and(|minutes| minutes == 0 || minutes > MAX_MINUTES)
        {
            return Err(invalid(format!(
                "max_hold_minutes must be within [1, {MAX_MINUTES}]"
            )));
        }
        self.params.validate().map_err(invalid)
    }
}

/// Sizing and exit settings for one order source.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskProfile {
    pub base_risk_percent: Decimal,
    pub atr_multiplier: Decimal,
    pub stop_loss_pips: Decimal,
    pub risk_reward: Option<Decimal>,
    pub max_hold_minutes: Option<u64>,
}
