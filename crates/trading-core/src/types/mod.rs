//! Core data types for the trading engine.

mod account;
mod instrument;
mod ohlcv;
mod order;
mod position;
mod signal;
mod snapshot;

pub use account::AccountState;
pub use instrument::InstrumentSpec;
pub use ohlcv::Bar;
pub use order::{OrderRequest, Side};
pub use position::{BrokerPosition, CloseReason, ClosedTrade, Position, PositionId, PositionState};
pub use signal::{clamp_confidence, Signal};
pub use snapshot::{HistoryRequirement, IndicatorSnapshot, Series};
