//! Signal generators and their configuration.
//!
//! Rule-based strategies:
//! - Extreme oscillator reversal (fast RSI)
//! - Volatility-expansion breakout (ATR ratio)
//! - Momentum crossover (MACD with trend filters)
//! - Time-windowed event trading
//! - Grid/recovery
//!
//! The forced generator is a separate, default-off test mode; it is never part
//! of a [`StrategySet`].

mod config;
mod extreme_reversal;
mod forced;
mod generator;
mod grid_recovery;
mod momentum;
mod news_event;
mod registry;
mod volatility_breakout;

pub use config::{
    ExtremeReversalParams, GridRecoveryParams, MomentumCrossoverParams, NewsEventParams,
    RiskProfile, StrategyConfig, StrategyKind, StrategyParams, TimeWindow,
    VolatilityBreakoutParams, MAX_GRID_LEVELS, MAX_GRID_MULTIPLIER, MAX_MINUTES,
};
pub use extreme_reversal::ExtremeReversal;
pub use forced::{ForcedSignalConfig, ForcedSignalGenerator};
pub use generator::SignalGenerator;
pub use grid_recovery::GridRecovery;
pub use momentum::MomentumCrossover;
pub use news_event::NewsEvent;
pub use registry::{
    catalogue, create_generator, validate_strategies, StrategyEntry, StrategyInfo, StrategySet,
};
pub use volatility_breakout::VolatilityBreakout;
