//! Diagnostic events and counters.
//!
//! Transient transport conditions are absorbed by the adapter. Everything
//! that represents lost data or an unexpected transport failure is reported
//! through a [`DiagnosticSink`] and counted in [`AdapterStats`].

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::warn;

use crate::error::TransportError;

/// Which transport pump reported a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PumpDirection {
    /// The receive pump, fed from the serial port.
    Receive,
    /// The transmit pump, draining to the serial port.
    Transmit,
}

impl PumpDirection {
    /// Lower-case label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Receive => "receive",
            Self::Transmit => "transmit",
        }
    }
}

/// Event crossing the adapter boundary.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    /// Bytes of a delivered frame did not fit in the inbound queue.
    InboundOverflow {
        /// Bytes dropped from this frame.
        dropped: usize,
        /// Bytes dropped since the adapter started.
        total: u64,
    },
    /// A frame handoff failed with a terminal error.
    TransportFault {
        /// Error returned by the transport.
        error: TransportError,
    },
    /// An outbound frame was discarded after repeated terminal failures.
    FrameDropped {
        /// Payload bytes discarded.
        len: usize,
        /// Last error returned by the transport.
        error: TransportError,
    },
    /// A transport pump failed with a terminal error.
    PumpFault {
        /// Failing pump.
        direction: PumpDirection,
        /// Error returned by the pump.
        error: TransportError,
    },
}

/// Receiver of [`Diagnostic`] events.
///
/// Sinks are invoked from the adapter's hot path and from the transport's
/// delivery callback; they must not block.
pub trait DiagnosticSink: Send + Sync {
    /// Handle one event.
    fn record(&self, event: &Diagnostic);
}

/// Sink that emits every event as a `tracing` warning.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, event: &Diagnostic) {
        match event {
            Diagnostic::InboundOverflow { dropped, total } => {
                warn!(dropped, total, "inbound queue overflow; bytes dropped");
            }
            Diagnostic::TransportFault { error } => {
                warn!(%error, "frame handoff failed");
            }
            Diagnostic::FrameDropped { len, error } => {
                warn!(len, %error, "outbound frame dropped");
            }
            Diagnostic::PumpFault { direction, error } => {
                warn!(direction = direction.as_str(), %error, "transport pump failed");
            }
        }
    }
}

/// Running counters kept by the adapter.
#[derive(Debug, Default)]
pub(crate) struct AdapterStats {
    frames_sent: AtomicU64,
    bytes_sent: AtomicU64,
    deferrals: AtomicU64,
    frames_dropped: AtomicU64,
    transport_errors: AtomicU64,
}

impl AdapterStats {
    pub(crate) fn record_handoff(&self, len: usize) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(len as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_deferral(&self) { self.deferrals.fetch_add(1, Ordering::Relaxed); }

    pub(crate) fn record_drop(&self) { self.frames_dropped.fetch_add(1, Ordering::Relaxed); }

    pub(crate) fn record_transport_error(&self) {
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, rx_bytes: u64, rx_overflow_bytes: u64) -> StatsSnapshot {
        StatsSnapshot {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            backpressure_deferrals: self.deferrals.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            rx_bytes,
            rx_overflow_bytes,
        }
    }
}

/// Point-in-time copy of the adapter counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Frames accepted by the transport.
    pub frames_sent: u64,
    /// Payload bytes accepted by the transport.
    pub bytes_sent: u64,
    /// Ticks on which a candidate frame was held back by the gate.
    pub backpressure_deferrals: u64,
    /// Outbound frames discarded after terminal failures.
    pub frames_dropped: u64,
    /// Terminal transport errors seen on handoff or in the pumps.
    pub transport_errors: u64,
    /// Inbound bytes queued for the application.
    pub rx_bytes: u64,
    /// Inbound bytes dropped because the queue was full.
    pub rx_overflow_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::{AdapterStats, Diagnostic, DiagnosticSink, PumpDirection, TracingSink};
    use crate::error::TransportError;

    #[test]
    fn snapshot_reflects_recorded_events() {
        let stats = AdapterStats::default();
        stats.record_handoff(10);
        stats.record_handoff(6);
        stats.record_deferral();
        stats.record_drop();
        stats.record_transport_error();

        let snapshot = stats.snapshot(40, 3);
        assert_eq!(snapshot.frames_sent, 2);
        assert_eq!(snapshot.bytes_sent, 16);
        assert_eq!(snapshot.backpressure_deferrals, 1);
        assert_eq!(snapshot.frames_dropped, 1);
        assert_eq!(snapshot.transport_errors, 1);
        assert_eq!(snapshot.rx_bytes, 40);
        assert_eq!(snapshot.rx_overflow_bytes, 3);
    }

    #[test]
    fn tracing_sink_accepts_every_event() {
        let sink = TracingSink;
        for event in [
            Diagnostic::InboundOverflow {
                dropped: 1,
                total: 1,
            },
            Diagnostic::TransportFault {
                error: TransportError::Fatal { code: -2 },
            },
            Diagnostic::FrameDropped {
                len: 4,
                error: TransportError::Fatal { code: -2 },
            },
            Diagnostic::PumpFault {
                direction: PumpDirection::Transmit,
                error: TransportError::Fatal { code: -5 },
            },
        ] {
            sink.record(&event);
        }
    }
}
