//! Execution and account adapter traits.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::BrokerError;
use crate::types::{AccountState, BrokerPosition, OrderRequest, PositionId};

/// Read-only account telemetry.
#[async_trait]
pub trait AccountProvider: Send + Sync {
    /// Current balance, equity and margin. Queried once per tick.
    async fn get_account_state(&self) -> Result<AccountState, BrokerError>;
}

/// Order execution and position bookkeeping at the broker.
///
/// The adapter is the single source of truth for whether a position exists.
/// The engine makes one submission attempt per signal per tick and never retries
/// a failed call within the same tick.
#[async_trait]
pub trait ExecutionAdapter: Send + Sync {
    /// Submit a market order with attached stops.
    ///
    /// # Returns
    /// The id of the resulting position
    async fn submit_order(&self, request: OrderRequest) -> Result<PositionId, BrokerError>;

    /// Replace the stop-loss and take-profit of an open position.
    async fn modify_position(
        &self,
        id: PositionId,
        stop_loss: Decimal,
        take_profit: Decimal,
    ) -> Result<(), BrokerError>;

    /// Close a position, fully when `volume` is `None`.
    async fn close_position(
        &self,
        id: PositionId,
        volume: Option<Decimal>,
    ) -> Result<(), BrokerError>;

    /// All positions currently open at the broker.
    async fn list_open_positions(&self) -> Result<Vec<BrokerPosition>, BrokerError>;

    /// Realized P/L of a position that has been closed, if the broker knows it.
    async fn closed_position_profit(
        &self,
        _id: PositionId,
    ) -> Result<Option<Decimal>, BrokerError> {
        Ok(None)
    }

    /// Adapter name for logs.
    fn name(&self) -> &str;
}
