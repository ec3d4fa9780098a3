//! Telemetry events emitted by the orchestrator.

use parking_lot::Mutex;
use rust_decimal::Decimal;
use trading_core::{
    error::{BrokerError, RiskInputError},
    types::{ClosedTrade, OrderRequest, PositionId, Signal},
};
use trading_risk::{EmergencyCause, RiskBlock};

/// Something the operator may want to see.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    SignalGenerated(Signal),
    OrderSubmitted {
        id: PositionId,
        request: OrderRequest,
        confidence: f64,
        forced: bool,
    },
    OrderFailed {
        strategy: String,
        instrument: String,
        error: BrokerError,
    },
    RiskGateBlocked {
        instrument: String,
        block: RiskBlock,
    },
    EmergencyStopActivated(EmergencyCause),
    EmergencyStopReset,
    /// Sizing or stop inputs were degenerate
    InvalidRiskInputs {
        strategy: String,
        instrument: String,
        error: RiskInputError,
        /// Volume used instead, or `None` when the order was dropped
        fallback_volume: Option<Decimal>,
    },
    TradeResultRecorded {
        trade: ClosedTrade,
        consecutive_wins: u32,
        consecutive_losses: u32,
    },
    PositionAdopted {
        id: PositionId,
        strategy: String,
    },
    PositionModified {
        id: PositionId,
        strategy: String,
        old_stop: Decimal,
        new_stop: Decimal,
    },
    PositionPartiallyClosed {
        id: PositionId,
        strategy: String,
        closed_volume: Decimal,
        remaining: Decimal,
    },
    PositionClosed(ClosedTrade),
    PositionActionFailed {
        id: PositionId,
        action: &'static str,
        error: BrokerError,
    },
    InstrumentSkipped {
        instrument: String,
        reason: String,
    },
    StrategySkipped {
        strategy: String,
        instrument: String,
        reason: String,
    },
    /// Account or position list unavailable; nothing else ran this tick
    TickAborted { reason: String },
    ConfigApplied,
    ConfigRejected { reason: String },
}

impl EngineEvent {
    /// Short stable name, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineEvent::SignalGenerated(_) => "signal_generated",
            EngineEvent::OrderSubmitted { .. } => "order_submitted",
            EngineEvent::OrderFailed { .. } => "order_failed",
            EngineEvent::RiskGateBlocked { .. } => "risk_gate_blocked",
            EngineEvent::EmergencyStopActivated(_) => "emergency_stop_activated",
            EngineEvent::EmergencyStopReset => "emergency_stop_reset",
            EngineEvent::InvalidRiskInputs { .. } => "invalid_risk_inputs",
            EngineEvent::TradeResultRecorded { .. } => "trade_result_recorded",
            EngineEvent::PositionAdopted { .. } => "position_adopted",
            EngineEvent::PositionModified { .. } => "position_modified",
            EngineEvent::PositionPartiallyClosed { .. } => "position_partially_closed",
            EngineEvent::PositionClosed(_) => "position_closed",
            EngineEvent::PositionActionFailed { .. } => "position_action_failed",
            EngineEvent::InstrumentSkipped { .. } => "instrument_skipped",
            EngineEvent::StrategySkipped { .. } => "strategy_skipped",
            EngineEvent::TickAborted { .. } => "tick_aborted",
            EngineEvent::ConfigApplied => "config_applied",
            EngineEvent::ConfigRejected { .. } => "config_rejected",
        }
    }
}

/// Receives every engine event as it happens.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &EngineEvent);
}

/// Discards events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &EngineEvent) {}
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().clone()
    }

    /// Drain recorded events.
    pub fn take(&self) -> Vec<EngineEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn count(&self, kind: &str) -> usize {
        self.events.lock().iter().filter(|e| e.kind() == kind).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &EngineEvent) {
        self.events.lock().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink() {
        let sink = RecordingSink::new();
        sink.emit(&EngineEvent::EmergencyStopReset);
        sink.emit(&EngineEvent::TickAborted {
            reason: "account unavailable".into(),
        });

        assert_eq!(sink.count("emergency_stop_reset"), 1);
        assert_eq!(sink.take().len(), 2);
        assert!(sink.events().is_empty());
    }
}
