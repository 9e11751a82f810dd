//! Slice emission and stream health metrics.

use metrics::{counter, gauge, histogram};

use crate::market::DataKind;

// ============================================================================
// Slice Metrics
// ============================================================================

/// Record one emitted slice.
///
/// # Arguments
///
/// * `data_points` - Number of data points in the slice, counting every tick
/// * `late` - Whether the slice was stamped at an earlier emission instant
#[allow(clippy::cast_precision_loss)]
pub fn record_slice_emitted(data_points: usize, late: bool) {
    counter!(
        "slices_emitted_total",
        "late" => if late { "true" } else { "false" }
    )
    .increment(1);

    histogram!("slice_data_points").record(data_points as f64);
}

// ============================================================================
// Subscription Metrics
// ============================================================================

/// Record a stream removed after a fault.
///
/// # Arguments
///
/// * `kind` - Data kind of the subscription
/// * `reason` - Fault class (e.g., `"io"`, `"out_of_order"`)
pub fn record_stream_fault(kind: DataKind, reason: &'static str) {
    counter!(
        "stream_faults_total",
        "kind" => kind.as_str(),
        "reason" => reason
    )
    .increment(1);
}

/// Record a stream removed after it finished.
pub fn record_stream_exhausted(kind: DataKind) {
    counter!(
        "streams_exhausted_total",
        "kind" => kind.as_str()
    )
    .increment(1);
}

/// Update the active subscription gauge.
#[allow(clippy::cast_precision_loss)]
pub fn set_active_subscriptions(count: usize) {
    gauge!("active_subscriptions").set(count as f64);
}
