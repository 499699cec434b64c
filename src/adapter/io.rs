//! [`std::io`] integration for shared adapter references.

use std::io;

use super::StreamAdapter;
use crate::{port::SerialPort, transport::FramedTransport};

impl<T, P> io::Write for &StreamAdapter<T, P>
where
    T: FramedTransport,
    P: SerialPort,
{
    /// Returns the short count accepted, or [`io::ErrorKind::WouldBlock`]
    /// when no byte of a non-empty buffer could be accepted.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match StreamAdapter::write(*self, buf) {
            0 => Err(io::ErrorKind::WouldBlock.into()),
            written => Ok(written),
        }
    }

    /// Requests a flush; the handoff happens on the next tick.
    fn flush(&mut self) -> io::Result<()> {
        StreamAdapter::flush(*self);
        Ok(())
    }
}

impl<T, P> io::Read for &StreamAdapter<T, P>
where
    T: FramedTransport,
    P: SerialPort,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.read_into(buf) {
            0 => Err(io::ErrorKind::WouldBlock.into()),
            read => Ok(read),
        }
    }
}
