//! Core types and traits for the trading engine.
//!
//! This crate provides the foundational building blocks including:
//! - Account, instrument, indicator snapshot and signal types
//! - Managed positions and the broker's view of them
//! - The engine error taxonomy
//! - Collaborator traits for indicator, account and execution providers

pub mod error;
pub mod traits;
pub mod types;

pub use error::{TradingError, TradingResult};
pub use traits::*;
pub use types::*;
