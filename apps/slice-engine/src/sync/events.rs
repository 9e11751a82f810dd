//! Events produced by the synchronizer.

use super::subscription::SubscriptionId;
use crate::error::StreamFault;
use crate::market::Timestamp;
use crate::slice::Slice;

/// One outcome of a synchronizer step.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// A slice is ready.
    Slice(Slice),

    /// A stream failed and was removed; the others continue.
    StreamFaulted {
        /// The removed subscription.
        subscription: SubscriptionId,
        /// Why it was removed.
        error: StreamFault,
    },

    /// Nothing is due at the current frontier.
    Idle {
        /// Frontier at this step.
        frontier: Timestamp,
        /// Earliest pending end time, if any stream has data buffered.
        next_due: Option<Timestamp>,
    },
}

impl SyncEvent {
    /// The slice, if this event carries one.
    #[must_use]
    pub fn into_slice(self) -> Option<Slice> {
        match self {
            Self::Slice(slice) => Some(slice),
            _ => None,
        }
    }

    /// Whether this is an idle event.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle { .. })
    }
}
