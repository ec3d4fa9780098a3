//! Core traits for the trading engine.

mod broker;
mod data_source;
mod indicator;

pub use broker::{AccountProvider, ExecutionAdapter};
pub use data_source::IndicatorProvider;
pub use indicator::Indicator;
