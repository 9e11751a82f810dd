//! Error types for slice lookup and subscription streams.
//!
//! | Error | Raised by | Effect |
//! |-------|-----------|--------|
//! | `SliceError::NotFound` | typed or symbol lookups on a `Slice` | caller falls back |
//! | `StreamFault` | a single subscription stream | stream removed, merge continues |
//!
//! Nothing here is fatal to a synchronization session. A frontier clock always
//! carries a seed instant, so there is no clock-misuse error to report.

use thiserror::Error;

use crate::market::{DataKind, Symbol, Timestamp};
use crate::sync::SubscriptionId;

/// Lookup failures on a slice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SliceError {
    /// No item of the requested kind exists for the symbol.
    #[error("No {kind} data for {symbol} in slice")]
    NotFound {
        /// Requested symbol.
        symbol: Symbol,
        /// Requested kind, or `None` for a symbol-only lookup.
        kind: LookupKind,
    },
}

impl SliceError {
    /// Build a `NotFound` for a symbol-only lookup.
    #[must_use]
    pub const fn missing_symbol(symbol: Symbol) -> Self {
        Self::NotFound {
            symbol,
            kind: LookupKind::Any,
        }
    }

    /// Build a `NotFound` for a typed lookup.
    #[must_use]
    pub const fn missing_kind(symbol: Symbol, kind: DataKind) -> Self {
        Self::NotFound {
            symbol,
            kind: LookupKind::Kind(kind),
        }
    }

    /// Build a `NotFound` for a custom kind lookup.
    #[must_use]
    pub fn missing_custom(symbol: Symbol, custom_kind: &str) -> Self {
        Self::NotFound {
            symbol,
            kind: LookupKind::Custom(custom_kind.to_string()),
        }
    }
}

/// What a failed lookup asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupKind {
    /// Any kind (canonical item).
    Any,
    /// A built-in kind.
    Kind(DataKind),
    /// A named custom kind.
    Custom(String),
}

impl std::fmt::Display for LookupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Kind(kind) => write!(f, "{kind}"),
            Self::Custom(name) => write!(f, "custom '{name}'"),
        }
    }
}

/// Failure of a single subscription stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamFault {
    /// IO error reading the underlying source.
    #[error("IO error: {0}")]
    Io(String),

    /// The stream produced a point that ends before one it already produced.
    #[error("Out-of-order data: end time {received} precedes {previous}")]
    OutOfOrder {
        /// End time of the last point accepted from the stream.
        previous: Timestamp,
        /// End time of the offending point.
        received: Timestamp,
    },

    /// The stream produced a point for a different subscription.
    #[error("Stream for {expected} produced data for {received}")]
    Misrouted {
        /// Subscription the stream serves.
        expected: SubscriptionId,
        /// Subscription the offending point belongs to.
        received: SubscriptionId,
    },

    /// A live feed lost its producer.
    #[error("Feed disconnected")]
    Disconnected,

    /// Source-specific failure.
    #[error("Source error: {0}")]
    Source(String),
}

impl StreamFault {
    /// Short label for logs and metrics.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::OutOfOrder { .. } => "out_of_order",
            Self::Misrouted { .. } => "misrouted",
            Self::Disconnected => "disconnected",
            Self::Source(_) => "source",
        }
    }
}

impl From<std::io::Error> for StreamFault {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}
