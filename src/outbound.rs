//! Outbound packet assembly and flush policy.
//!
//! [`OutboundFrame`] accumulates application bytes into a single buffer
//! bounded by the MTU. [`Readiness`] classifies that buffer each tick and
//! decides whether it should be handed to the transport.

mod flush;

use std::time::Instant;

pub use flush::Readiness;

/// Frame buffer filled by application writes.
///
/// The buffer is allocated once at construction. The start timestamp is
/// present exactly while the buffer holds bytes.
#[derive(Debug)]
pub struct OutboundFrame {
    buf: Vec<u8>,
    capacity: usize,
    started_at: Option<Instant>,
    flush_requested: bool,
    fatal_failures: u32,
}

impl OutboundFrame {
    /// Create an empty frame buffer holding up to `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            capacity,
            started_at: None,
            flush_requested: false,
            fatal_failures: 0,
        }
    }

    /// Maximum number of bytes per frame.
    #[must_use]
    pub fn capacity(&self) -> usize { self.capacity }

    /// Number of bytes currently buffered.
    #[must_use]
    pub fn len(&self) -> usize { self.buf.len() }

    /// Return `true` when no bytes are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.buf.is_empty() }

    /// Return `true` when the buffer has reached its capacity.
    #[must_use]
    pub fn is_full(&self) -> bool { self.buf.len() >= self.capacity }

    /// Free space remaining in the frame.
    #[must_use]
    pub fn remaining(&self) -> usize { self.capacity - self.buf.len() }

    /// Time the first buffered byte was written.
    #[must_use]
    pub fn started_at(&self) -> Option<Instant> { self.started_at }

    /// Buffered bytes, in write order.
    #[must_use]
    pub fn bytes(&self) -> &[u8] { &self.buf }

    /// Append `byte`, stamping the start time when the buffer was empty.
    ///
    /// Returns `false` without modifying the buffer when it is full.
    pub fn push(&mut self, byte: u8, now: Instant) -> bool {
        if self.is_full() {
            return false;
        }
        if self.buf.is_empty() {
            self.started_at = Some(now);
        }
        self.buf.push(byte);
        true
    }

    /// Record an explicit flush request for the next evaluation.
    pub fn request_flush(&mut self) { self.flush_requested = true; }

    /// Return `true` while an explicit flush is pending.
    #[must_use]
    pub fn flush_requested(&self) -> bool { self.flush_requested }

    /// Classify the buffer at `now` given the idle-flush timeout.
    ///
    /// A flush request made while the buffer is empty is discarded here.
    pub fn readiness(&mut self, now: Instant, idle_timeout: std::time::Duration) -> Readiness {
        let elapsed = self
            .started_at
            .map(|started| now.saturating_duration_since(started))
            .unwrap_or_default();
        let readiness = Readiness::evaluate(
            self.buf.len(),
            self.capacity,
            elapsed,
            idle_timeout,
            self.flush_requested,
        );
        if readiness == Readiness::Empty {
            self.flush_requested = false;
        }
        readiness
    }

    /// Count a terminal handoff failure, returning the consecutive total.
    pub fn record_fatal_failure(&mut self) -> u32 {
        self.fatal_failures = self.fatal_failures.saturating_add(1);
        self.fatal_failures
    }

    /// Break a run of terminal failures after a non-terminal outcome.
    pub fn reset_fatal_failures(&mut self) { self.fatal_failures = 0; }

    /// Empty the buffer after a handoff or drop.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.started_at = None;
        self.flush_requested = false;
        self.fatal_failures = 0;
    }
}
