//! Per-tick reports and a running session summary.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use trading_core::types::ClosedTrade;

use crate::events::{EngineEvent, EventSink};

/// Everything that happened during one orchestration pass.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub time: DateTime<Utc>,
    pub events: Vec<EngineEvent>,
}

impl TickReport {
    pub fn new(time: DateTime<Utc>) -> Self {
        Self {
            time,
            events: Vec::new(),
        }
    }

    /// Forward `event` to `sink` and keep a copy.
    pub(crate) fn record(&mut self, sink: &dyn EventSink, event: EngineEvent) {
        sink.emit(&event);
        self.events.push(event);
    }

    pub fn count(&self, kind: &str) -> usize {
        self.events.iter().filter(|e| e.kind() == kind).count()
    }

    pub fn orders_submitted(&self) -> usize {
        self.count("order_submitted")
    }

    pub fn closed_trades(&self) -> impl Iterator<Item = &ClosedTrade> {
        self.events.iter().filter_map(|e| match e {
            EngineEvent::PositionClosed(trade) => Some(trade),
            _ => None,
        })
    }

    pub fn aborted(&self) -> bool {
        self.count("tick_aborted") > 0
    }
}

/// Counters accumulated over many ticks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub initial_equity: Decimal,
    pub final_equity: Decimal,
    pub ticks: usize,
    pub aborted_ticks: usize,
    pub signals: usize,
    pub forced_signals: usize,
    pub orders_submitted: usize,
    pub orders_failed: usize,
    pub gate_blocks: usize,
    pub invalid_risk_inputs: usize,
    pub stops_trailed: usize,
    pub partial_closes: usize,
    pub closed_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub realized_profit: Decimal,
    pub emergency_stops: usize,
}

impl SessionSummary {
    pub fn new(initial_equity: Decimal) -> Self {
        Self {
            initial_equity,
            final_equity: initial_equity,
            ticks: 0,
            aborted_ticks: 0,
            signals: 0,
            forced_signals: 0,
            orders_submitted: 0,
            orders_failed: 0,
            gate_blocks: 0,
            invalid_risk_inputs: 0,
            stops_trailed: 0,
            partial_closes: 0,
            closed_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            realized_profit: Decimal::ZERO,
            emergency_stops: 0,
        }
    }

    /// Fold one tick into the totals.
    pub fn record(&mut self, report: &TickReport) {
        self.ticks += 1;
        for event in &report.events {
            match event {
                EngineEvent::SignalGenerated(signal) => {
                    self.signals += 1;
                    if signal.forced {
                        self.forced_signals += 1;
                    }
                }
                EngineEvent::OrderSubmitted { .. } => self.orders_submitted += 1,
                EngineEvent::OrderFailed { .. } => self.orders_failed += 1,
                EngineEvent::RiskGateBlocked { .. } => self.gate_blocks += 1,
                EngineEvent::InvalidRiskInputs { .. } => self.invalid_risk_inputs += 1,
                EngineEvent::PositionModified { .. } => self.stops_trailed += 1,
                EngineEvent::PositionPartiallyClosed { .. } => self.partial_closes += 1,
                EngineEvent::PositionClosed(trade) => {
                    self.closed_trades += 1;
                    self.realized_profit += trade.profit;
                    if trade.is_win() {
                        self.winning_trades += 1;
                    } else {
                        self.losing_trades += 1;
                    }
                }
                EngineEvent::EmergencyStopActivated(_) => self.emergency_stops += 1,
                EngineEvent::TickAborted { .. } => self.aborted_ticks += 1,
                _ => {}
            }
        }
    }

    pub fn win_rate_pct(&self) -> Decimal {
        if self.closed_trades == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.winning_trades) / Decimal::from(self.closed_trades) * dec!(100)
    }

    pub fn total_return_pct(&self) -> Decimal {
        if self.initial_equity <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (self.final_equity - self.initial_equity) / self.initial_equity * dec!(100)
    }

    /// Generate a text summary.
    pub fn summary(&self) -> String {
        let mut s = String::new();

        s.push_str("═══════════════════════════════════════════════════════════\n");
        s.push_str("                      SESSION SUMMARY                      \n");
        s.push_str("═══════════════════════════════════════════════════════════\n\n");

        s.push_str("ACCOUNT\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Initial Equity:      {:.2}\n", self.initial_equity));
        s.push_str(&format!("  Final Equity:        {:.2}\n", self.final_equity));
        s.push_str(&format!("  Total Return:        {:.2}%\n", self.total_return_pct()));
        s.push_str(&format!("  Realized P/L:        {:.2}\n", self.realized_profit));
        s.push_str(&format!("  Emergency Stops:     {}\n", self.emergency_stops));
        s.push('\n');

        s.push_str("TRADING\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!(
            "  Signals:             {} ({} forced)\n",
            self.signals, self.forced_signals
        ));
        s.push_str(&format!("  Orders Submitted:    {}\n", self.orders_submitted));
        s.push_str(&format!("  Orders Failed:       {}\n", self.orders_failed));
        s.push_str(&format!("  Gate Blocks:         {}\n", self.gate_blocks));
        s.push_str(&format!("  Invalid Risk Inputs: {}\n", self.invalid_risk_inputs));
        s.push('\n');

        s.push_str("POSITIONS\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Closed Trades:       {}\n", self.closed_trades));
        s.push_str(&format!("  Winning Trades:      {}\n", self.winning_trades));
        s.push_str(&format!("  Losing Trades:       {}\n", self.losing_trades));
        s.push_str(&format!("  Win Rate:            {:.2}%\n", self.win_rate_pct()));
        s.push_str(&format!("  Stops Trailed:       {}\n", self.stops_trailed));
        s.push_str(&format!("  Partial Closes:      {}\n", self.partial_closes));
        s.push('\n');

        s.push_str("EXECUTION\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Ticks Processed:     {}\n", self.ticks));
        s.push_str(&format!("  Ticks Aborted:       {}\n", self.aborted_ticks));
        s.push('\n');

        s.push_str("═══════════════════════════════════════════════════════════\n");

        s
    }
}
