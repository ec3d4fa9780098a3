//! Exposure limits consulted before a signal is sized.

use serde::{Deserialize, Serialize};

/// Result of a limit check.
#[derive(Debug, Clone, PartialEq)]
pub enum LimitCheck {
    /// Trade allowed
    Allowed,
    /// Trade blocked with reason
    Blocked { reason: String },
}

impl LimitCheck {
    pub fn is_allowed(&self) -> bool {
        matches!(self, LimitCheck::Allowed)
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, LimitCheck::Blocked { .. })
    }
}

/// Per-strategy exposure limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExposureLimits {
    /// Global cap on open positions per strategy
    pub max_positions_per_strategy: usize,
}

impl Default for ExposureLimits {
    fn default() -> Self {
        Self {
            max_positions_per_strategy: 3,
        }
    }
}

impl ExposureLimits {
    /// Effective cap: the lower of the global per-strategy limit and the
    /// strategy's own `max_positions`.
    pub fn strategy_limit(&self, strategy_max_positions: usize) -> usize {
        self.max_positions_per_strategy.min(strategy_max_positions)
    }

    /// Check whether `strategy` may open another position.
    pub fn check_strategy(
        &self,
        strategy: &str,
        held: usize,
        strategy_max_positions: usize,
    ) -> LimitCheck {
        let limit = self.strategy_limit(strategy_max_positions);
        if held >= limit {
            return LimitCheck::Blocked {
                reason: format!("{strategy} holds {held} positions (limit: {limit})"),
            };
        }
        LimitCheck::Allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lower_limit_wins() {
        let limits = ExposureLimits {
            max_positions_per_strategy: 3,
        };
        assert_eq!(limits.strategy_limit(5), 3);
        assert_eq!(limits.strategy_limit(1), 1);
    }

    #[test]
    fn test_check_strategy() {
        let limits = ExposureLimits::default();
        assert!(limits.check_strategy("grid", 1, 2).is_allowed());
        let blocked = limits.check_strategy("grid", 2, 2);
        assert!(blocked.is_blocked());
        assert_eq!(
            blocked,
            LimitCheck::Blocked {
                reason: "grid holds 2 positions (limit: 2)".into()
            }
        );
    }
}
