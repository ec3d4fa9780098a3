//! Indicator provider trait.

use async_trait::async_trait;

use crate::error::DataError;
use crate::types::IndicatorSnapshot;

/// Supplies pre-computed indicator snapshots, refreshed once per new bar.
#[async_trait]
pub trait IndicatorProvider: Send + Sync {
    /// Latest snapshot for `instrument`.
    ///
    /// Insufficient history must be reported as an error, never as a panic or a
    /// partially filled snapshot that readers could index out of bounds.
    async fn get_snapshot(&self, instrument: &str) -> Result<IndicatorSnapshot, DataError>;

    /// Provider name for logs.
    fn name(&self) -> &str;
}
