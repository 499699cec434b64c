//! Raw byte transport underneath the framed transport.
//!
//! [`SerialPort`] abstracts a UART or similar byte pipe. The adapter binds
//! its bounded-timeout primitives into the read and write closures handed to
//! the transport pumps, passing every transfer through a
//! [`FaultInjector`](crate::fault::FaultInjector).

use std::{io, time::Duration};

use crate::fault::FaultInjector;

/// Byte pipe with bounded-wait read and write primitives.
///
/// Both halves may be used concurrently from different contexts when the
/// adapter runs in split mode, so methods take `&self`.
#[cfg_attr(test, mockall::automock)]
pub trait SerialPort: Send + Sync {
    /// Number of bytes that can be read without waiting.
    fn bytes_available(&self) -> usize;

    /// Read up to `buf.len()` bytes, waiting at most `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] when the underlying device fails.
    fn read_timeout(&self, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;

    /// Write up to `buf.len()` bytes, waiting at most `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] when the underlying device fails.
    fn write_timeout(&self, buf: &[u8], timeout: Duration) -> io::Result<usize>;
}

/// Read through `port`, letting `faults` corrupt the reported byte count.
pub(crate) fn faulty_read<P: SerialPort + ?Sized>(
    port: &P,
    faults: &dyn FaultInjector,
    buf: &mut [u8],
    timeout: Duration,
) -> io::Result<usize> {
    let read = port.read_timeout(buf, timeout)?;
    Ok(faults.on_read(read).min(read))
}

/// Write through `port` after letting `faults` shorten the request.
pub(crate) fn faulty_write<P: SerialPort + ?Sized>(
    port: &P,
    faults: &dyn FaultInjector,
    buf: &[u8],
    timeout: Duration,
) -> io::Result<usize> {
    let len = faults.on_write(buf.len()).min(buf.len());
    port.write_timeout(&buf[..len], timeout)
}
