//! Deterministic fault injection.

use std::sync::atomic::{AtomicUsize, Ordering};

use serialframe::FaultInjector;

/// Corrupts every `n`th transfer in one direction.
///
/// Stalled writes only delay data. Truncated reads lose the bytes that were
/// read but not reported, which a lossless transport cannot recover from.
#[derive(Debug)]
pub struct EveryNthFault {
    n: usize,
    stall_writes: bool,
    truncate_reads: bool,
    calls: AtomicUsize,
    injected: AtomicUsize,
}

impl EveryNthFault {
    /// Report zero bytes written on every `n`th write.
    ///
    /// # Panics
    ///
    /// Panics if `n` is zero.
    pub fn stall_writes(n: usize) -> Self { Self::new(n, true, false) }

    /// Drop the last byte of every `n`th read.
    ///
    /// # Panics
    ///
    /// Panics if `n` is zero.
    pub fn truncate_reads(n: usize) -> Self { Self::new(n, false, true) }

    fn new(n: usize, stall_writes: bool, truncate_reads: bool) -> Self {
        assert!(n > 0, "fault period must be non-zero");
        Self {
            n,
            stall_writes,
            truncate_reads,
            calls: AtomicUsize::new(0),
            injected: AtomicUsize::new(0),
        }
    }

    /// Number of faults injected so far.
    pub fn injected(&self) -> usize { self.injected.load(Ordering::Relaxed) }

    fn strike(&self) -> bool {
        let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        let hit = call % self.n == 0;
        if hit {
            self.injected.fetch_add(1, Ordering::Relaxed);
        }
        hit
    }
}

impl FaultInjector for EveryNthFault {
    fn on_read(&self, transferred: usize) -> usize {
        if self.truncate_reads && transferred > 0 && self.strike() {
            transferred - 1
        } else {
            transferred
        }
    }

    fn on_write(&self, requested: usize) -> usize {
        if self.stall_writes && requested > 0 && self.strike() {
            0
        } else {
            requested
        }
    }
}
