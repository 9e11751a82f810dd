//! Historical data: requests, the provider port, and slice fan-out.
//!
//! History is served through the same merge as live data, with the frontier
//! pinned at the end of time so nothing waits.

mod error;
mod provider;
mod request;

pub use error::HistoryError;
pub use provider::{HistoryProvider, HistorySlices, InMemoryHistoryProvider, push_through};
pub use request::{HistoryRequest, lookback_requests};
