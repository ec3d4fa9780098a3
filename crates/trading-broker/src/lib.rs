//! Execution adapters.
//!
//! [`PaperBroker`] fills market orders at the last known price, enforces lot
//! geometry, stop distances and margin, and closes positions whose stop-loss or
//! take-profit is touched by a price update.

mod paper;

pub use paper::PaperBroker;
