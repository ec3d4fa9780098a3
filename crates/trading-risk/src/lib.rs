//! Risk management for trading.
//!
//! Provides account-level gating (drawdown, daily loss, position count,
//! emergency stop), adaptive position sizing and dynamic stop placement.

mod position_sizer;
mod risk_manager;
mod state;
mod stop_loss;

pub use position_sizer::{PositionSizer, RiskAdjustments, Sizing, SizingRequest};
pub use risk_manager::{EmergencyCause, RiskBlock, RiskConfig, RiskManager};
pub use state::{RiskState, VolatilityRegime};
pub use stop_loss::{ProtectiveLevels, StopLossCalculator, StopSettings};
