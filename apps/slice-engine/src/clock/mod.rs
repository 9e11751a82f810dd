//! Time providers and the frontier clock.
//!
//! The frontier is the single agreed instant beyond which no data may be
//! exposed. One driver advances it; any number of readers observe it.

mod frontier;
mod provider;

pub use frontier::{FrontierClock, FrontierReader};
pub use provider::{ManualTimeProvider, RealTimeProvider, TimeProvider};
