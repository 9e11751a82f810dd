//! Observability for the slice engine.
//!
//! Metrics go through the `metrics` facade; whichever recorder the host
//! process installs receives them. Without a recorder every call is a no-op.

mod metrics;

pub use metrics::{
    record_slice_emitted, record_stream_exhausted, record_stream_fault, set_active_subscriptions,
};
