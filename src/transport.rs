//! Contract consumed from the reliable framed transport.
//!
//! The transport owns frame numbering, acknowledgment tracking,
//! retransmission and checksums. The adapter only hands it whole frames,
//! drives its receive and transmit pumps with byte-level I/O closures, and
//! reads its window telemetry to apply backpressure.

use std::{io, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Callback invoked by the transport once per fully received frame.
///
/// The callback must not block; it runs inside the transport's receive pump.
pub type ReceiveCallback = Box<dyn Fn(&[u8]) + Send + Sync>;

/// Byte-level read primitive handed to [`FramedTransport::run_receive_pump`].
pub type ReadFn<'a> = dyn FnMut(&mut [u8]) -> io::Result<usize> + 'a;

/// Byte-level write primitive handed to [`FramedTransport::run_transmit_pump`].
pub type WriteFn<'a> = dyn FnMut(&[u8]) -> io::Result<usize> + 'a;

/// Integrity check applied by the transport to each frame on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChecksumMode {
    /// 8-bit additive checksum; suited to very small controllers.
    Sum8,
    /// CRC-16; detects considerably more line errors.
    #[default]
    Crc16,
}

/// Link state reported by [`FramedTransport::status`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkStatus {
    /// The peer has acknowledged the connection.
    Connected,
    /// No connection is established.
    Disconnected,
    /// The transport is in an error state.
    Error,
}

/// One-time settings applied through [`FramedTransport::configure`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransportSettings {
    /// Frame integrity check.
    pub checksum: ChecksumMode,
    /// Number of frames that may be in flight unacknowledged.
    pub window_size: u8,
    /// Retransmission attempts before the transport gives up on a frame.
    pub retry_count: u8,
    /// Delay between retransmission attempts.
    pub retry_timeout: Duration,
}

/// Read-only snapshot of the transport's outgoing window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowTelemetry {
    /// Sequence number of the most recent frame sent.
    pub last_sent_seq: u32,
    /// Sequence number of the most recent frame confirmed by the peer.
    pub last_confirmed_seq: u32,
    /// Maximum number of frames the transport keeps in flight.
    pub max_in_flight: usize,
    /// Modulus of the transport's sequence numbers (8 for a 3-bit field).
    pub sequence_space: u32,
}

impl WindowTelemetry {
    /// Number of frames sent but not yet confirmed.
    ///
    /// Computed modulo [`sequence_space`](Self::sequence_space) so wrapped
    /// sequence numbers are handled. A zero sequence space is treated as the
    /// full `u32` range.
    #[must_use]
    pub fn busy_slots(&self) -> usize {
        let distance = self.last_sent_seq.wrapping_sub(self.last_confirmed_seq);
        let busy = match self.sequence_space {
            0 => distance,
            space if space.is_power_of_two() => distance & (space - 1),
            space => {
                // Non power-of-two spaces keep sequence numbers below the
                // modulus, so reduce both operands first.
                let space = u64::from(space);
                let sent = u64::from(self.last_sent_seq) % space;
                let confirmed = u64::from(self.last_confirmed_seq) % space;
                let busy = (sent + space - confirmed) % space;
                return usize::try_from(busy).unwrap_or(usize::MAX);
            }
        };
        usize::try_from(busy).unwrap_or(usize::MAX)
    }
}

/// Reliable framed transport driven by the adapter.
///
/// Implementations are shared between the application context and the pump
/// contexts, so every method takes `&self` and the transport is responsible
/// for its own internal locking.
pub trait FramedTransport: Send + Sync {
    /// Apply one-time settings before first use.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the transport cannot honour the
    /// requested settings.
    fn configure(&self, settings: &TransportSettings) -> Result<(), TransportError>;

    /// Largest frame payload the transport's buffers can hold.
    fn max_frame_size(&self) -> usize;

    /// Largest window the transport supports.
    fn max_window_size(&self) -> u8 { 7 }

    /// Register the callback receiving each inbound frame.
    fn set_receive_callback(&self, callback: ReceiveCallback);

    /// Queue `frame` for reliable delivery.
    ///
    /// The transport copies the bytes; the slice is only borrowed for the
    /// duration of the call.
    ///
    /// # Errors
    ///
    /// Returns a transient [`TransportError`] when the frame cannot be queued
    /// now, or [`TransportError::Fatal`] for unexpected failures.
    fn write(&self, frame: &[u8]) -> Result<(), TransportError>;

    /// Pull bytes through `read` and deliver any completed frames.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the pump fails.
    fn run_receive_pump(&self, read: &mut ReadFn<'_>) -> Result<(), TransportError>;

    /// Push pending frames, acknowledgments and retransmissions through
    /// `write`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the pump fails.
    fn run_transmit_pump(&self, write: &mut WriteFn<'_>) -> Result<(), TransportError>;

    /// Current link state.
    fn status(&self) -> LinkStatus;

    /// Snapshot of the outgoing window.
    fn window_telemetry(&self) -> WindowTelemetry;
}
