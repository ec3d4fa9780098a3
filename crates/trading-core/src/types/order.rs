//! Order direction and order requests.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Trade direction (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Get the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Get the sign for price calculations (+1 for buy, -1 for sell).
    pub fn sign(&self) -> Decimal {
        match self {
            Side::Buy => Decimal::ONE,
            Side::Sell => -Decimal::ONE,
        }
    }

    /// Whether `candidate` is strictly better than `current` for a stop on this side.
    ///
    /// Long stops improve upwards, short stops improve downwards.
    pub fn is_tighter(&self, candidate: Decimal, current: Decimal) -> bool {
        match self {
            Side::Buy => candidate > current,
            Side::Sell => candidate < current,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Market order with attached protective stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Instrument to trade
    pub instrument: String,
    /// Buy or sell
    pub side: Side,
    /// Volume in lots
    pub volume: Decimal,
    /// Stop-loss price
    pub stop_loss: Decimal,
    /// Take-profit price
    pub take_profit: Decimal,
    /// Strategy tag carried to the broker so positions can be attributed on reconcile
    pub strategy: String,
    /// Reference price used for sizing and margin checks
    pub reference_price: Decimal,
    /// Free-form order comment shown at the broker
    #[serde(default)]
    pub comment: String,
}

impl OrderRequest {
    /// Create a market order request.
    pub fn market(
        instrument: impl Into<String>,
        side: Side,
        volume: Decimal,
        reference_price: Decimal,
    ) -> Self {
        Self {
            instrument: instrument.into(),
            side,
            volume,
            stop_loss: Decimal::ZERO,
            take_profit: Decimal::ZERO,
            strategy: String::new(),
            reference_price,
            comment: String::new(),
        }
    }

    /// Attach stop-loss and take-profit prices.
    pub fn with_stops(mut self, stop_loss: Decimal, take_profit: Decimal) -> Self {
        self.stop_loss = stop_loss;
        self.take_profit = take_profit;
        self
    }

    /// Tag the order with the originating strategy.
    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = strategy.into();
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }
}
