//! Window-occupancy backpressure for frame handoff.
//!
//! Handing a frame to a transport whose outgoing queue is nearly saturated
//! makes the transport drop it. [`BackpressureGate`] keeps a configurable
//! number of window slots free and defers handoff until the peer has
//! confirmed enough frames.

use tracing::debug;

use crate::transport::WindowTelemetry;

/// Outcome of consulting the gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateDecision {
    /// The frame may be handed off now.
    Open,
    /// Handoff must wait; the frame stays buffered unchanged.
    Deferred {
        /// Frames sent but not yet confirmed.
        busy: usize,
        /// Transport-reported in-flight limit.
        max_in_flight: usize,
    },
}

impl GateDecision {
    /// Return `true` when handoff may proceed.
    #[must_use]
    pub const fn is_open(self) -> bool { matches!(self, Self::Open) }
}

/// Gate admitting handoffs while enough window slots remain free.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackpressureGate {
    safety_margin: usize,
}

impl BackpressureGate {
    /// Create a gate that keeps `safety_margin` slots free.
    #[must_use]
    pub const fn new(safety_margin: usize) -> Self { Self { safety_margin } }

    /// Number of slots kept free.
    #[must_use]
    pub const fn safety_margin(&self) -> usize { self.safety_margin }

    /// Decide whether one more frame fits in the window described by
    /// `telemetry`.
    ///
    /// An idle window always admits a frame so a window smaller than the
    /// margin cannot stall the adapter forever.
    #[must_use]
    pub fn admit(&self, telemetry: &WindowTelemetry) -> GateDecision {
        let max_in_flight = telemetry.max_in_flight;
        let mut busy = telemetry.busy_slots();
        if busy > max_in_flight {
            debug!(busy, max_in_flight, "transport reported more busy slots than its window");
            busy = max_in_flight;
        }
        if busy == 0 {
            return GateDecision::Open;
        }
        if busy + 1 + self.safety_margin > max_in_flight {
            GateDecision::Deferred {
                busy,
                max_in_flight,
            }
        } else {
            GateDecision::Open
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{BackpressureGate, GateDecision};
    use crate::transport::WindowTelemetry;

    fn window(busy: u32, max_in_flight: usize) -> WindowTelemetry {
        WindowTelemetry {
            last_sent_seq: 10 + busy,
            last_confirmed_seq: 10,
            max_in_flight,
            sequence_space: 8,
        }
    }

    #[rstest]
    #[case::idle(0, true)]
    #[case::one_busy(1, true)]
    #[case::last_admissible(4, true)]
    #[case::margin_reached(5, false)]
    #[case::saturated(7, false)]
    fn keeps_margin_free(#[case] busy: u32, #[case] open: bool) {
        let gate = BackpressureGate::new(2);
        assert_eq!(gate.admit(&window(busy, 7)).is_open(), open);
    }

    #[test]
    fn deferral_reports_occupancy() {
        let gate = BackpressureGate::new(2);
        assert_eq!(
            gate.admit(&window(5, 7)),
            GateDecision::Deferred {
                busy: 5,
                max_in_flight: 7
            }
        );
    }

    #[test]
    fn idle_window_admits_even_when_margin_exceeds_window() {
        let gate = BackpressureGate::new(4);
        assert!(gate.admit(&window(0, 2)).is_open());
        assert!(!gate.admit(&window(1, 2)).is_open());
    }

    #[test]
    fn overreported_occupancy_is_clamped() {
        let gate = BackpressureGate::new(0);
        let telemetry = WindowTelemetry {
            last_sent_seq: 6,
            last_confirmed_seq: 0,
            max_in_flight: 3,
            sequence_space: 8,
        };
        assert_eq!(
            gate.admit(&telemetry),
            GateDecision::Deferred {
                busy: 3,
                max_in_flight: 3
            }
        );
    }
}
