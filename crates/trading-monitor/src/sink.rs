//! Engine events as structured log lines.

use tracing::{debug, error, info, warn};
use trading_engine::{EngineEvent, EventSink};

/// Writes every [`EngineEvent`] through `tracing`.
///
/// Emergency stops log at error level, rejections and failures at warn, routine
/// activity at info and per-strategy skips at debug.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl TracingEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for TracingEventSink {
    fn emit(&self, event: &EngineEvent) {
        let kind = event.kind();
        match event {
            EngineEvent::SignalGenerated(signal) => info!(
                kind,
                strategy = %signal.strategy,
                instrument = %signal.instrument,
                side = %signal.side,
                confidence = signal.confidence,
                forced = signal.forced,
                reason = %signal.reason,
                "Signal generated"
            ),
            EngineEvent::OrderSubmitted {
                id,
                request,
                confidence,
                forced,
            } => info!(
                kind,
                %id,
                strategy = %request.strategy,
                instrument = %request.instrument,
                side = %request.side,
                volume = %request.volume,
                stop_loss = %request.stop_loss,
                take_profit = %request.take_profit,
                confidence,
                forced,
                "Order submitted"
            ),
            EngineEvent::OrderFailed {
                strategy,
                instrument,
                error,
            } => warn!(kind, %strategy, %instrument, %error, "Order failed"),
            EngineEvent::RiskGateBlocked { instrument, block } => {
                warn!(kind, %instrument, %block, "Trading blocked by risk gate")
            }
            EngineEvent::EmergencyStopActivated(cause) => {
                error!(kind, %cause, "EMERGENCY STOP activated")
            }
            EngineEvent::EmergencyStopReset => warn!(kind, "Emergency stop reset by operator"),
            EngineEvent::InvalidRiskInputs {
                strategy,
                instrument,
                error,
                fallback_volume,
            } => match fallback_volume {
                Some(volume) => warn!(
                    kind, %strategy, %instrument, %error, %volume,
                    "Invalid risk inputs, using minimum volume"
                ),
                None => warn!(kind, %strategy, %instrument, %error, "Invalid risk inputs, signal dropped"),
            },
            EngineEvent::TradeResultRecorded {
                trade,
                consecutive_wins,
                consecutive_losses,
            } => info!(
                kind,
                strategy = %trade.strategy,
                profit = %trade.profit,
                consecutive_wins,
                consecutive_losses,
                "Trade result recorded"
            ),
            EngineEvent::PositionAdopted { id, strategy } => {
                info!(kind, %id, %strategy, "Untracked broker position adopted")
            }
            EngineEvent::PositionModified {
                id,
                strategy,
                old_stop,
                new_stop,
            } => info!(kind, %id, %strategy, %old_stop, %new_stop, "Stop trailed"),
            EngineEvent::PositionPartiallyClosed {
                id,
                strategy,
                closed_volume,
                remaining,
            } => info!(kind, %id, %strategy, %closed_volume, %remaining, "Partial close"),
            EngineEvent::PositionClosed(trade) => info!(
                kind,
                id = %trade.position_id,
                strategy = %trade.strategy,
                instrument = %trade.instrument,
                profit = %trade.profit,
                reason = ?trade.reason,
                "Position closed"
            ),
            EngineEvent::PositionActionFailed { id, action, error } => {
                warn!(kind, %id, action, %error, "Position action failed")
            }
            EngineEvent::InstrumentSkipped { instrument, reason } => {
                warn!(kind, %instrument, %reason, "Instrument skipped this tick")
            }
            EngineEvent::StrategySkipped {
                strategy,
                instrument,
                reason,
            } => debug!(kind, %strategy, %instrument, %reason, "Strategy skipped"),
            EngineEvent::TickAborted { reason } => warn!(kind, %reason, "Tick aborted"),
            EngineEvent::ConfigApplied => info!(kind, "Configuration applied"),
            EngineEvent::ConfigRejected { reason } => {
                warn!(kind, %reason, "Configuration rejected, keeping previous")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;
    use std::io;
    use std::sync::Arc;
    use trading_core::error::BrokerError;
    use trading_core::types::{OrderRequest, PositionId, Side};
    use trading_engine::EngineEvent;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(events: &[EngineEvent]) -> String {
        let buffer = Capture::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            for event in events {
                TracingEventSink::new().emit(event);
            }
        });
        let bytes = buffer.0.lock().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_order_submitted_fields() {
        let request = OrderRequest::market("EURUSD", Side::Buy, dec!(0.5), dec!(1.25))
            .with_stops(dec!(1.248), dec!(1.254))
            .with_strategy("reversal");
        let output = capture(&[EngineEvent::OrderSubmitted {
            id: PositionId::new(),
            request,
            confidence: 72.5,
            forced: false,
        }]);

        assert!(output.contains("INFO"));
        assert!(output.contains("kind=\"order_submitted\""));
        assert!(output.contains("strategy=reversal"));
        assert!(output.contains("volume=0.5"));
    }

    #[test]
    fn test_levels_follow_severity() {
        let output = capture(&[
            EngineEvent::OrderFailed {
                strategy: "grid".to_string(),
                instrument: "EURUSD".to_string(),
                error: BrokerError::Connection("down".to_string()),
            },
            EngineEvent::StrategySkipped {
                strategy: "momentum".to_string(),
                instrument: "EURUSD".to_string(),
                reason: "short history".to_string(),
            },
        ]);

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("WARN"));
        assert!(lines[1].contains("DEBUG"));
    }
}
