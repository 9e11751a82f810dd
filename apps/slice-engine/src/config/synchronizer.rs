//! Synchronizer driving configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Synchronizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynchronizerConfig {
    /// Sleep between steps while nothing is due, in milliseconds.
    #[serde(default = "default_idle_poll_interval_ms")]
    pub idle_poll_interval_ms: u64,
    /// Capacity of the driver's event channel.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for SynchronizerConfig {
    fn default() -> Self {
        Self {
            idle_poll_interval_ms: default_idle_poll_interval_ms(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

impl SynchronizerConfig {
    /// Idle poll interval as a duration.
    #[must_use]
    pub const fn idle_poll_interval(&self) -> Duration {
        Duration::from_millis(self.idle_poll_interval_ms)
    }
}

const fn default_idle_poll_interval_ms() -> u64 {
    50
}

const fn default_event_channel_capacity() -> usize {
    1024
}
