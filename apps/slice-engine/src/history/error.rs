//! History provider error types.

use thiserror::Error;

use crate::market::Timestamp;

/// History provider errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    /// Request end precedes its start.
    #[error("Invalid history range: start {start} > end {end}")]
    InvalidRange {
        /// Requested start.
        start: Timestamp,
        /// Requested end.
        end: Timestamp,
    },

    /// The provider holds no data for the subscription.
    #[error("No history for {0}")]
    NoData(String),

    /// Provider-specific failure.
    #[error("History source error: {0}")]
    Source(String),
}
