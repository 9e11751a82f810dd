//! Frontier clock: a cached, monotonic view of a wrapped time provider.

use std::sync::Arc;

use tracing::warn;

use super::provider::{ManualTimeProvider, TimeProvider};
use crate::market::Timestamp;

/// Wraps a time provider and caches its readings as the frontier.
///
/// [`FrontierClock::now`] polls the wrapped provider and publishes the result;
/// [`FrontierReader`] handles read the published value without polling.
/// `now` takes `&mut self`: the clock has exactly one driver.
pub struct FrontierClock {
    source: Arc<dyn TimeProvider>,
    frontier: Arc<ManualTimeProvider>,
}

impl std::fmt::Debug for FrontierClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrontierClock")
            .field("source", &self.source.name())
            .field("frontier", &self.frontier.now())
            .finish()
    }
}

impl FrontierClock {
    /// Create a frontier clock seeded with the provider's current instant.
    pub fn new(source: Arc<dyn TimeProvider>) -> Self {
        let seed = source.now();
        Self {
            source,
            frontier: Arc::new(ManualTimeProvider::new(seed)),
        }
    }

    /// Poll the wrapped provider and advance the frontier.
    ///
    /// Returns the published value, so it always equals what
    /// [`FrontierReader::now`] reports afterwards. A provider that moves
    /// backwards leaves the frontier where it was.
    pub fn now(&mut self) -> Timestamp {
        let polled = self.source.now();
        let current = self.frontier.now();

        if polled < current {
            warn!(
                source = self.source.name(),
                polled = %polled,
                frontier = %current,
                "Time provider moved backwards; holding frontier"
            );
            return current;
        }

        self.frontier.set(polled);
        self.frontier.now()
    }

    /// Last published frontier, without polling.
    #[must_use]
    pub fn current(&self) -> Timestamp {
        self.frontier.now()
    }

    /// Read-only handle on the frontier.
    #[must_use]
    pub fn frontier(&self) -> FrontierReader {
        FrontierReader {
            frontier: Arc::clone(&self.frontier),
        }
    }
}

/// Cheap, cloneable read-only view of a [`FrontierClock`].
///
/// Safe to share across threads; readings are stable until the driver calls
/// [`FrontierClock::now`] again.
#[derive(Debug, Clone)]
pub struct FrontierReader {
    frontier: Arc<ManualTimeProvider>,
}

impl FrontierReader {
    /// Last published frontier.
    #[must_use]
    pub fn now(&self) -> Timestamp {
        self.frontier.now()
    }
}

impl TimeProvider for FrontierReader {
    fn now(&self) -> Timestamp {
        self.frontier.now()
    }

    fn name(&self) -> &'static str {
        "FrontierReader"
    }
}
