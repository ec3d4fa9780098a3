//! Logging setup and the tracing telemetry sink.

mod logging;
mod sink;

pub use logging::setup_logging;
pub use sink::TracingEventSink;
