//! Position supervision for the trading engine.
//!
//! The [`PositionManager`] owns every position the engine opened or adopted. Each
//! tick it reconciles against the broker's list, then applies time exits,
//! partial closes and trailing stops in that order.

mod exits;
mod limits;
mod manager;
mod trailing;

pub use exits::{hold_expired, partial_close, PartialClose, PartialCloseConfig};
pub use limits::{ExposureLimits, LimitCheck};
pub use manager::{
    broker_call, ManageReport, PositionEvent, PositionManager, PositionManagerConfig,
    Reconciliation,
};
pub use trailing::{next_stop, TrailingConfig};
