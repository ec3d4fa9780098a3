//! Bar-driven trading engine.
//!
//! On every new bar the [`Orchestrator`]:
//! 1. reads the account and refreshes the risk manager (drawdown, daily loss,
//!    emergency stop),
//! 2. reconciles managed positions with the broker,
//! 3. per instrument, manages open positions (time exits, partial closes,
//!    trailing stops),
//! 4. evaluates strategies in priority order, sizes and submits their signals,
//! 5. falls back to the forced generator when enabled and nothing was placed.

mod config;
mod events;
mod orchestrator;
mod report;

pub use config::{EngineConfig, EngineSettings};
pub use events::{EngineEvent, EventSink, NullSink, RecordingSink};
pub use orchestrator::{Collaborators, Orchestrator};
pub use report::{SessionSummary, TickReport};
