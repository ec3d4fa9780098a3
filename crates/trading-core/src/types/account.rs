//! Account telemetry snapshot.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Account state read once per tick from the account provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountState {
    /// Settled balance
    pub balance: Decimal,
    /// Balance plus floating P/L
    pub equity: Decimal,
    /// Margin available for new positions
    pub free_margin: Decimal,
    /// Account leverage (e.g. 100 for 1:100)
    pub leverage: Decimal,
    /// Reference balance for drawdown and emergency thresholds
    pub initial_balance: Decimal,
}

impl AccountState {
    /// Create a flat account where balance, equity and free margin are equal.
    pub fn new(initial_balance: Decimal, leverage: Decimal) -> Self {
        Self {
            balance: initial_balance,
            equity: initial_balance,
            free_margin: initial_balance,
            leverage,
            initial_balance,
        }
    }

    /// Floating profit or loss of open positions.
    pub fn floating_pnl(&self) -> Decimal {
        self.equity - self.balance
    }

    /// Total loss from the initial balance as a percentage (negative when in profit).
    pub fn total_loss_pct(&self) -> Decimal {
        if self.initial_balance <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (self.initial_balance - self.equity) / self.initial_balance * Decimal::ONE_HUNDRED
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_total_loss_pct() {
        let mut account = AccountState::new(dec!(10000), dec!(100));
        account.equity = dec!(7500);
        assert_eq!(account.total_loss_pct(), dec!(25));
        assert_eq!(account.floating_pnl(), dec!(-2500));
    }

    #[test]
    fn test_total_loss_pct_zero_initial() {
        let account = AccountState::new(Decimal::ZERO, dec!(100));
        assert_eq!(account.total_loss_pct(), Decimal::ZERO);
    }
}
