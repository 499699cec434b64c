//! Fault injection seam for the byte-level I/O closures.
//!
//! Production adapters use [`NoFaults`]. Tests supply their own
//! [`FaultInjector`] to simulate line noise by shortening transfers, which
//! exercises the transport's retransmission path end to end.

/// Strategy consulted on every byte-level transfer made on behalf of the
/// transport pumps.
pub trait FaultInjector: Send + Sync {
    /// Return the byte count to report for a read that transferred
    /// `transferred` bytes. Values above `transferred` are clamped.
    fn on_read(&self, transferred: usize) -> usize { transferred }

    /// Return the number of bytes to actually write out of `requested`.
    /// Values above `requested` are clamped.
    fn on_write(&self, requested: usize) -> usize { requested }
}

/// Injector that never alters a transfer.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoFaults;

impl FaultInjector for NoFaults {}
