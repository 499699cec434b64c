//! Lossless reference transport for in-memory lines.
//!
//! Frames are written to the wire as a big-endian `u16` length followed by
//! the payload. There are no acknowledgments: a frame counts as confirmed
//! once its last byte has been written to the port. Window occupancy is
//! therefore the number of frames queued or partially written.

use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard, PoisonError},
};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serialframe::{
    FramedTransport,
    LinkStatus,
    ReadFn,
    ReceiveCallback,
    TransportError,
    TransportSettings,
    WindowTelemetry,
    WriteFn,
};

const HEADER_LEN: usize = 2;
const READ_CHUNK: usize = 256;
const SEQUENCE_SPACE: u32 = 8;

#[derive(Debug)]
struct State {
    window: u8,
    pending: VecDeque<Bytes>,
    inbound: BytesMut,
    sent: u32,
    confirmed: u32,
    status: LinkStatus,
}

/// In-memory [`FramedTransport`] that never loses or reorders frames.
pub struct LoopbackTransport {
    max_frame_size: usize,
    state: Mutex<State>,
    callback: Mutex<Option<ReceiveCallback>>,
}

impl LoopbackTransport {
    /// Create a transport accepting payloads up to `max_frame_size` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `max_frame_size` does not fit the `u16` length prefix.
    pub fn new(max_frame_size: usize) -> Self {
        assert!(
            u16::try_from(max_frame_size).is_ok(),
            "frame size must fit a u16 length prefix"
        );
        Self {
            max_frame_size,
            state: Mutex::new(State {
                window: 7,
                pending: VecDeque::new(),
                inbound: BytesMut::new(),
                sent: 0,
                confirmed: 0,
                status: LinkStatus::Connected,
            }),
            callback: Mutex::new(None),
        }
    }

    /// Force the reported link state.
    pub fn set_status(&self, status: LinkStatus) { self.state().status = status; }

    /// Frames accepted by [`write`](FramedTransport::write) so far.
    pub fn frames_sent(&self) -> u32 { self.state().sent }

    /// Frames fully written to the port so far.
    pub fn frames_confirmed(&self) -> u32 { self.state().confirmed }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn deliver(&self, frames: Vec<Bytes>) {
        let callback = self.callback.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(callback) = callback.as_ref() {
            for frame in frames {
                callback(&frame);
            }
        }
    }
}

impl FramedTransport for LoopbackTransport {
    fn configure(&self, settings: &TransportSettings) -> Result<(), TransportError> {
        self.state().window = settings.window_size;
        Ok(())
    }

    fn max_frame_size(&self) -> usize { self.max_frame_size }

    fn set_receive_callback(&self, callback: ReceiveCallback) {
        *self.callback.lock().unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    fn write(&self, frame: &[u8]) -> Result<(), TransportError> {
        let Ok(len) = u16::try_from(frame.len()) else {
            return Err(TransportError::Fatal { code: -90 });
        };
        if frame.len() > self.max_frame_size {
            return Err(TransportError::Fatal { code: -90 });
        }
        let mut state = self.state();
        if state.status != LinkStatus::Connected {
            return Err(TransportError::Disconnected);
        }
        if state.pending.len() >= usize::from(state.window) {
            return Err(TransportError::NoSpace);
        }
        let mut encoded = BytesMut::with_capacity(HEADER_LEN + frame.len());
        encoded.put_u16(len);
        encoded.put_slice(frame);
        state.pending.push_back(encoded.freeze());
        state.sent = state.sent.wrapping_add(1);
        Ok(())
    }

    fn run_receive_pump(&self, read: &mut ReadFn<'_>) -> Result<(), TransportError> {
        let mut chunk = [0u8; READ_CHUNK];
        let frames = {
            let mut state = self.state();
            loop {
                let n = read(&mut chunk[..])?;
                state.inbound.extend_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    break;
                }
            }
            let mut frames = Vec::new();
            while state.inbound.len() >= HEADER_LEN {
                let len = usize::from(u16::from_be_bytes([state.inbound[0], state.inbound[1]]));
                if state.inbound.len() < HEADER_LEN + len {
                    break;
                }
                state.inbound.advance(HEADER_LEN);
                frames.push(state.inbound.split_to(len).freeze());
            }
            frames
        };
        self.deliver(frames);
        Ok(())
    }

    fn run_transmit_pump(&self, write: &mut WriteFn<'_>) -> Result<(), TransportError> {
        let mut state = self.state();
        while let Some(front) = state.pending.front_mut() {
            let n = write(&front[..])?;
            if n == 0 {
                break;
            }
            front.advance(n);
            if front.is_empty() {
                state.pending.pop_front();
                state.confirmed = state.confirmed.wrapping_add(1);
            }
        }
        Ok(())
    }

    fn status(&self) -> LinkStatus { self.state().status }

    fn window_telemetry(&self) -> WindowTelemetry {
        let state = self.state();
        WindowTelemetry {
            last_sent_seq: state.sent % SEQUENCE_SPACE,
            last_confirmed_seq: state.confirmed % SEQUENCE_SPACE,
            max_in_flight: usize::from(state.window),
            sequence_space: SEQUENCE_SPACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serialframe::{FramedTransport, SerialPort, TransportError};

    use super::LoopbackTransport;
    use crate::MemoryPort;

    #[test]
    fn frames_cross_the_wire_whole() {
        let (a_port, b_port) = MemoryPort::pair();
        let a = LoopbackTransport::new(16);
        let b = LoopbackTransport::new(16);
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        b.set_receive_callback(Box::new(move |frame: &[u8]| {
            sink.lock().expect("received lock").push(frame.to_vec());
        }));

        a.write(b"abc").expect("first frame");
        a.write(b"de").expect("second frame");
        assert_eq!(a.window_telemetry().busy_slots(), 2);

        a.run_transmit_pump(&mut |buf: &[u8]| a_port.write_timeout(buf, std::time::Duration::ZERO))
            .expect("transmit");
        assert_eq!(a.window_telemetry().busy_slots(), 0);

        b.run_receive_pump(&mut |buf: &mut [u8]| {
            b_port.read_timeout(buf, std::time::Duration::ZERO)
        })
        .expect("receive");
        assert_eq!(
            *received.lock().expect("received lock"),
            vec![b"abc".to_vec(), b"de".to_vec()]
        );
    }

    #[test]
    fn full_window_reports_no_space() {
        let t = LoopbackTransport::new(16);
        for _ in 0..7 {
            t.write(b"x").expect("window slot");
        }
        assert_eq!(t.write(b"x"), Err(TransportError::NoSpace));
    }

    #[test]
    fn oversized_frames_are_fatal() {
        let t = LoopbackTransport::new(4);
        assert!(matches!(t.write(b"12345"), Err(TransportError::Fatal { .. })));
    }
}
