//! Managed positions and the broker's view of them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::{InstrumentSpec, OrderRequest, Side};

/// Broker-assigned position identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionId(pub Uuid);

impl PositionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PositionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a managed position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionState {
    /// Order accepted, not yet confirmed by the broker's position list
    Opening,
    /// Confirmed and subject to trailing, partial-close and time-exit rules
    Open,
    /// Close requested
    Closing,
    /// Gone; removed from the managed set
    Closed,
}

/// A position owned by the position manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub strategy: String,
    pub instrument: String,
    pub side: Side,
    pub open_price: Decimal,
    pub volume: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub open_time: DateTime<Utc>,
    /// Best excursion in pips (>= 0)
    pub max_profit_seen: Decimal,
    /// Worst adverse excursion in pips, as a positive number
    pub max_loss_seen: Decimal,
    pub trailing_active: bool,
    pub partially_closed: bool,
    pub state: PositionState,
    /// Last money P/L reported by the broker
    pub last_profit: Decimal,
}

impl Position {
    /// Track a freshly submitted order.
    pub fn opening(id: PositionId, request: &OrderRequest, open_time: DateTime<Utc>) -> Self {
        Self {
            id,
            strategy: request.strategy.clone(),
            instrument: request.instrument.clone(),
            side: request.side,
            open_price: request.reference_price,
            volume: request.volume,
            stop_loss: request.stop_loss,
            take_profit: request.take_profit,
            open_time,
            max_profit_seen: Decimal::ZERO,
            max_loss_seen: Decimal::ZERO,
            trailing_active: false,
            partially_closed: false,
            state: PositionState::Opening,
            last_profit: Decimal::ZERO,
        }
    }

    /// Adopt a position the broker reports but we are not tracking.
    pub fn adopted(broker: &BrokerPosition) -> Self {
        Self {
            id: broker.id,
            strategy: broker.strategy.clone(),
            instrument: broker.instrument.clone(),
            side: broker.side,
            open_price: broker.open_price,
            volume: broker.volume,
            stop_loss: broker.stop_loss,
            take_profit: broker.take_profit,
            open_time: broker.open_time,
            max_profit_seen: Decimal::ZERO,
            max_loss_seen: Decimal::ZERO,
            trailing_active: false,
            partially_closed: false,
            state: PositionState::Open,
            last_profit: broker.profit,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == PositionState::Open
    }

    /// Unrealized profit in pips at `price` (negative when losing).
    pub fn profit_pips(&self, price: Decimal, pip_size: Decimal) -> Decimal {
        if pip_size <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (price - self.open_price) * self.side.sign() / pip_size
    }

    /// Unrealized money P/L at `price`.
    pub fn profit_money(&self, price: Decimal, instrument: &InstrumentSpec) -> Decimal {
        self.profit_pips(price, instrument.pip_size) * instrument.pip_value * self.volume
    }

    /// Update the excursion watermarks for `price`; returns current profit in pips.
    pub fn observe(&mut self, price: Decimal, pip_size: Decimal) -> Decimal {
        let pips = self.profit_pips(price, pip_size);
        if pips > self.max_profit_seen {
            self.max_profit_seen = pips;
        }
        if -pips > self.max_loss_seen {
            self.max_loss_seen = -pips;
        }
        pips
    }

    /// Sync mutable fields from the broker's report.
    pub fn sync_from(&mut self, broker: &BrokerPosition) {
        self.volume = broker.volume;
        self.stop_loss = broker.stop_loss;
        self.take_profit = broker.take_profit;
        self.open_price = broker.open_price;
        self.last_profit = broker.profit;
    }
}

/// Open position as reported by the execution adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerPosition {
    pub id: PositionId,
    pub instrument: String,
    pub side: Side,
    pub volume: Decimal,
    pub open_price: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub open_time: DateTime<Utc>,
    /// Floating money P/L
    pub profit: Decimal,
    /// Strategy tag attached at submission
    pub strategy: String,
}

/// Why a managed position left the managed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// Held longer than the strategy allows
    TimeExit,
    /// Disappeared from the broker (stop-loss, take-profit or external close)
    Broker,
}

/// A fully closed position, ready for streak bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub position_id: PositionId,
    pub strategy: String,
    pub instrument: String,
    pub side: Side,
    pub volume: Decimal,
    pub open_price: Decimal,
    pub profit: Decimal,
    pub reason: CloseReason,
}

impl ClosedTrade {
    pub fn from_position(position: &Position, profit: Decimal, reason: CloseReason) -> Self {
        Self {
            position_id: position.id,
            strategy: position.strategy.clone(),
            instrument: position.instrument.clone(),
            side: position.side,
            volume: position.volume,
            open_price: position.open_price,
            profit,
            reason,
        }
    }

    pub fn is_win(&self) -> bool {
        self.profit > Decimal::ZERO
    }
}
