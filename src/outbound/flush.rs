//! Flush policy evaluated once per adapter tick.

use std::time::Duration;

/// Derived state of the outbound frame buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Readiness {
    /// Nothing buffered.
    Empty,
    /// Bytes buffered, waiting for more or for the idle timeout.
    Filling,
    /// The buffer holds a full MTU of bytes.
    Full,
    /// The oldest buffered byte has waited at least the idle timeout.
    IdleExpired,
    /// The application asked for the partial frame to be sent.
    FlushRequested,
}

impl Readiness {
    /// Classify a buffer. The first matching rule wins: empty, full, explicit
    /// flush, idle expiry, otherwise still filling.
    #[must_use]
    pub fn evaluate(
        len: usize,
        capacity: usize,
        elapsed: Duration,
        idle_timeout: Duration,
        flush_requested: bool,
    ) -> Self {
        if len == 0 {
            Self::Empty
        } else if len >= capacity {
            Self::Full
        } else if flush_requested {
            Self::FlushRequested
        } else if elapsed >= idle_timeout {
            Self::IdleExpired
        } else {
            Self::Filling
        }
    }

    /// Return `true` when the frame should be handed to the transport.
    #[must_use]
    pub const fn is_candidate(self) -> bool {
        matches!(self, Self::Full | Self::IdleExpired | Self::FlushRequested)
    }
}
