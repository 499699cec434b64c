//! Time source used for idle-flush and write-budget decisions.

use std::time::Instant;

/// Monotonic time source.
///
/// The adapter never sleeps on the clock; it only compares readings, so a
/// manually advanced clock gives tests exact control over flush timing.
pub trait Clock: Send + Sync {
    /// Current reading.
    fn now(&self) -> Instant;
}

/// [`Clock`] backed by [`Instant::now`].
#[derive(Clone, Copy, Debug, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant { Instant::now() }
}
