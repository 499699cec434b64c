//! Metric helpers for `serialframe`.
//!
//! This module defines metric names and simple helper functions
//! wrapping the [`metrics`](https://docs.rs/metrics) crate. Without the
//! `metrics` feature every helper compiles to a no-op.

#[cfg(feature = "metrics")]
use metrics::counter;

/// Name of the counter tracking frames moved through the adapter.
pub const FRAMES_TOTAL: &str = "serialframe_frames_total";
/// Name of the counter tracking inbound bytes lost to queue overflow.
pub const BYTES_DROPPED: &str = "serialframe_bytes_dropped_total";
/// Name of the counter tracking outbound frames discarded.
pub const FRAMES_DROPPED: &str = "serialframe_frames_dropped_total";
/// Name of the counter tracking terminal transport errors.
pub const TRANSPORT_ERRORS: &str = "serialframe_transport_errors_total";
/// Name of the counter tracking handoffs deferred by backpressure.
pub const BACKPRESSURE_DEFERRALS: &str = "serialframe_backpressure_deferrals_total";

/// Direction of frame processing.
#[derive(Clone, Copy, Debug)]
pub enum Direction {
    /// Frames delivered by the transport.
    Inbound,
    /// Frames handed to the transport.
    Outbound,
}

impl Direction {
    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// Record a frame moving in the given direction.
pub fn inc_frames(direction: Direction) {
    #[cfg(feature = "metrics")]
    counter!(FRAMES_TOTAL, "direction" => direction.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = direction;
}

/// Record inbound bytes dropped on overflow.
pub fn add_dropped_bytes(count: usize) {
    #[cfg(feature = "metrics")]
    counter!(BYTES_DROPPED).increment(count as u64);
    #[cfg(not(feature = "metrics"))]
    let _ = count;
}

/// Record an outbound frame discarded.
pub fn inc_dropped_frames() {
    #[cfg(feature = "metrics")]
    counter!(FRAMES_DROPPED).increment(1);
}

/// Record a terminal transport error.
pub fn inc_transport_errors() {
    #[cfg(feature = "metrics")]
    counter!(TRANSPORT_ERRORS).increment(1);
}

/// Record a handoff deferred by the backpressure gate.
pub fn inc_deferrals() {
    #[cfg(feature = "metrics")]
    counter!(BACKPRESSURE_DEFERRALS).increment(1);
}
