// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::items_after_statements
    )
)]

//! Slice Engine - Rust Core Library
//!
//! Time-synchronization core for the Cream trading system. Market data from
//! many independent subscriptions is merged into an ordered sequence of
//! immutable time slices, and no slice ever exposes data from beyond the
//! current frontier.
//!
//! # Layout
//!
//! - `market`: value objects (timestamps, symbols, bars, ticks, custom data)
//! - `clock`: time providers and the frontier clock
//! - `slice`: the per-instant snapshot handed to strategy code
//! - `sync`: subscription streams, the synchronizer, and its async driver
//! - `history`: history requests and providers served through the same merge
//! - `config`, `telemetry`, `observability`: ambient configuration, logging, metrics
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use slice_engine::clock::ManualTimeProvider;
//! use slice_engine::market::{DataKind, Timestamp};
//! use slice_engine::sync::{IterFeed, SliceSynchronizer, SubscriptionId};
//!
//! let clock = Arc::new(ManualTimeProvider::new(Timestamp::MAX));
//! let mut sync = SliceSynchronizer::builder()
//!     .time_provider(clock)
//!     .feed(SubscriptionId::new("SPY", DataKind::TradeBar), IterFeed::from_vec(bars))
//!     .build();
//!
//! for slice in sync.ready_slices() {
//!     println!("{} symbols at {}", slice.len(), slice.time());
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Core
// =============================================================================

pub mod clock;
pub mod error;
pub mod market;
pub mod slice;
pub mod sync;

// =============================================================================
// History
// =============================================================================

pub mod history;

// =============================================================================
// Infrastructure
// =============================================================================

pub mod config;
pub mod observability;
pub mod telemetry;

pub use clock::{FrontierClock, FrontierReader, ManualTimeProvider, RealTimeProvider, TimeProvider};
pub use error::{LookupKind, SliceError, StreamFault};
pub use slice::{Slice, SliceData, SliceItem};
pub use sync::{SliceSynchronizer, SyncDriver, SyncEvent};
