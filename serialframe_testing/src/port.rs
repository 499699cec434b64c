//! In-memory serial line.

use std::{
    collections::VecDeque,
    io,
    sync::{Arc, Condvar, Mutex, PoisonError},
    time::{Duration, Instant},
};

use serialframe::SerialPort;

#[derive(Debug, Default)]
struct Wire {
    bytes: Mutex<VecDeque<u8>>,
    ready: Condvar,
}

impl Wire {
    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<u8>> {
        self.bytes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One end of a lossless in-memory serial line.
///
/// Reads block for at most their timeout waiting for the peer to write.
/// Writes always complete immediately.
#[derive(Debug, Clone)]
pub struct MemoryPort {
    rx: Arc<Wire>,
    tx: Arc<Wire>,
}

impl MemoryPort {
    /// Create two connected ends; bytes written to one are read from the
    /// other.
    pub fn pair() -> (Self, Self) {
        let a_to_b = Arc::new(Wire::default());
        let b_to_a = Arc::new(Wire::default());
        (
            Self {
                rx: Arc::clone(&b_to_a),
                tx: Arc::clone(&a_to_b),
            },
            Self {
                rx: a_to_b,
                tx: b_to_a,
            },
        )
    }

    /// Bytes written by this end that the peer has not read yet.
    pub fn in_flight(&self) -> usize { self.tx.lock().len() }

    /// Inject raw bytes as if the peer had written them.
    pub fn inject(&self, bytes: &[u8]) {
        self.rx.lock().extend(bytes);
        self.rx.ready.notify_all();
    }
}

impl SerialPort for MemoryPort {
    fn bytes_available(&self) -> usize { self.rx.lock().len() }

    fn read_timeout(&self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        let deadline = Instant::now() + timeout;
        let mut queued = self.rx.lock();
        while queued.is_empty() {
            let now = Instant::now();
            if now >= deadline {
                return Ok(0);
            }
            queued = self
                .rx
                .ready
                .wait_timeout(queued, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        let n = buf.len().min(queued.len());
        for (slot, byte) in buf.iter_mut().zip(queued.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write_timeout(&self, buf: &[u8], _timeout: Duration) -> io::Result<usize> {
        self.tx.lock().extend(buf);
        self.tx.ready.notify_all();
        Ok(buf.len())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serialframe::SerialPort;

    use super::MemoryPort;

    #[test]
    fn bytes_cross_the_line_in_order() {
        let (a, b) = MemoryPort::pair();
        a.write_timeout(b"hello", Duration::ZERO).expect("write");
        assert_eq!(b.bytes_available(), 5);
        assert_eq!(a.in_flight(), 5);

        let mut buf = [0u8; 3];
        assert_eq!(b.read_timeout(&mut buf, Duration::ZERO).expect("read"), 3);
        assert_eq!(&buf, b"hel");
        assert_eq!(b.read_timeout(&mut buf, Duration::ZERO).expect("read"), 2);
        assert_eq!(&buf[..2], b"lo");
        assert_eq!(b.read_timeout(&mut buf, Duration::ZERO).expect("read"), 0);
    }

    #[test]
    fn read_waits_for_peer_within_timeout() {
        let (a, b) = MemoryPort::pair();
        let writer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            a.write_timeout(b"x", Duration::ZERO).expect("write");
        });
        let mut buf = [0u8; 1];
        let read = b
            .read_timeout(&mut buf, Duration::from_secs(5))
            .expect("read");
        writer.join().expect("writer thread");
        assert_eq!(read, 1);
        assert_eq!(buf[0], b'x');
    }
}
