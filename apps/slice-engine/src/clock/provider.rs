//! Time provider port and its real/manual adapters.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Duration;

use crate::market::Timestamp;

/// Port for time abstraction.
///
/// - [`RealTimeProvider`] for live trading
/// - [`ManualTimeProvider`] for backtests and deterministic tests
pub trait TimeProvider: Send + Sync {
    /// Current instant according to this provider.
    fn now(&self) -> Timestamp;

    /// Provider name for logs.
    fn name(&self) -> &'static str {
        "TimeProvider"
    }
}

/// Reads the system clock on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealTimeProvider;

impl RealTimeProvider {
    /// Create a wall-clock provider.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl TimeProvider for RealTimeProvider {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }

    fn name(&self) -> &'static str {
        "RealTimeProvider"
    }
}

/// Explicitly settable clock.
///
/// The instant is held in one atomic word (Unix microseconds), so concurrent
/// readers never observe a partially written value.
#[derive(Debug)]
pub struct ManualTimeProvider {
    micros: AtomicI64,
}

impl ManualTimeProvider {
    /// Create a manual clock reading `start`.
    #[must_use]
    pub fn new(start: Timestamp) -> Self {
        Self {
            micros: AtomicI64::new(start.to_unix_micros_saturating()),
        }
    }

    /// Overwrite the current instant.
    pub fn set(&self, time: Timestamp) {
        self.micros
            .store(time.to_unix_micros_saturating(), Ordering::Release);
    }

    /// Move the clock forward (or back, for a negative duration).
    pub fn advance(&self, by: Duration) {
        let next = self.now().saturating_add(by);
        self.set(next);
    }
}

impl TimeProvider for ManualTimeProvider {
    fn now(&self) -> Timestamp {
        Timestamp::from_unix_micros(self.micros.load(Ordering::Acquire))
    }

    fn name(&self) -> &'static str {
        "ManualTimeProvider"
    }
}
