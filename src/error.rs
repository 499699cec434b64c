//! Error types shared by the adapter and its transport contract.
//!
//! Transport results are classified into transient conditions, which the
//! adapter retries silently on the next tick, and terminal conditions, which
//! cross the boundary through the diagnostic sink.

use std::io;

use thiserror::Error;

/// Errors reported by a [`FramedTransport`](crate::transport::FramedTransport).
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The operation did not complete within its wait budget.
    #[error("transport operation timed out")]
    Timeout,
    /// The outgoing queue has no free slot right now.
    #[error("transport has no space for another frame")]
    NoSpace,
    /// The link is not established yet or was lost.
    #[error("transport is disconnected")]
    Disconnected,
    /// The transport rejected the operation with an unexpected error code.
    #[error("fatal transport error (code {code})")]
    Fatal {
        /// Transport-specific error code.
        code: i32,
    },
}

impl TransportError {
    /// Return `true` when the condition is expected under normal load and the
    /// operation should simply be retried on the next tick.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::NoSpace | Self::Disconnected)
    }
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Self::Timeout,
            io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset => Self::Disconnected,
            _ => Self::Fatal {
                code: err.raw_os_error().unwrap_or(-1),
            },
        }
    }
}
