//! Inbound reassembly queue fed by the transport's frame-delivery callback.
//!
//! [`InboundQueue`] is a bounded single-producer/single-consumer byte ring.
//! The producer is whichever context runs the transport receive pump (the
//! delivery callback); the consumer is the application reading the stream.
//! The two may run on different threads without locking: indices are
//! published with release/acquire ordering and every slot is an atomic byte,
//! so no `unsafe` is needed.
//!
//! Only one concurrent writer and one concurrent reader are supported.
//! Several writers or several readers racing each other may lose or
//! duplicate bytes; the queue stays memory safe but its FIFO guarantee no
//! longer holds.
//!
//! Pushing never blocks. A byte that does not fit is dropped and counted;
//! bytes already queued are never overwritten.

#[cfg(not(loom))]
use std::sync::atomic::{AtomicU8, AtomicU64, AtomicUsize, Ordering};

#[cfg(loom)]
use loom::sync::atomic::{AtomicU8, AtomicU64, AtomicUsize, Ordering};

#[cfg(test)]
mod tests;

/// Bounded SPSC byte queue with overflow accounting.
#[derive(Debug)]
pub struct InboundQueue {
    slots: Box<[AtomicU8]>,
    /// Next position to read, in `0..2 * capacity`.
    head: AtomicUsize,
    /// Next position to write, in `0..2 * capacity`.
    tail: AtomicUsize,
    overflow: AtomicU64,
    accepted: AtomicU64,
}

impl InboundQueue {
    /// Allocate a queue holding up to `capacity` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or too large to index twice over.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "inbound queue capacity must be non-zero");
        assert!(
            capacity.checked_mul(4).is_some(),
            "inbound queue capacity too large"
        );
        Self {
            slots: (0..capacity).map(|_| AtomicU8::new(0)).collect(),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            overflow: AtomicU64::new(0),
            accepted: AtomicU64::new(0),
        }
    }

    /// Maximum number of bytes the queue can hold.
    #[must_use]
    pub fn capacity(&self) -> usize { self.slots.len() }

    /// Number of bytes currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        self.distance(head, tail)
    }

    /// Return `true` when no bytes are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Total bytes dropped because the queue was full.
    #[must_use]
    pub fn overflow_count(&self) -> u64 { self.overflow.load(Ordering::Relaxed) }

    /// Total bytes accepted since construction.
    #[must_use]
    pub fn accepted_count(&self) -> u64 { self.accepted.load(Ordering::Relaxed) }

    /// Append one byte. Producer side only.
    ///
    /// Returns `false` and counts an overflow when the queue is full.
    pub fn push(&self, byte: u8) -> bool {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if self.distance(head, tail) == self.capacity() {
            self.overflow.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        self.slots[tail % self.capacity()].store(byte, Ordering::Relaxed);
        self.tail.store(self.advance(tail), Ordering::Release);
        self.accepted.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Append every byte of `frame` in order. Producer side only.
    ///
    /// Returns the number of bytes dropped for lack of space.
    pub fn push_frame(&self, frame: &[u8]) -> usize {
        frame.iter().filter(|&&byte| !self.push(byte)).count()
    }

    /// Remove and return the oldest byte. Consumer side only.
    pub fn pop(&self) -> Option<u8> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if head == tail {
            return None;
        }
        let byte = self.slots[head % self.capacity()].load(Ordering::Relaxed);
        self.head.store(self.advance(head), Ordering::Release);
        Some(byte)
    }

    /// Return the oldest byte without removing it. Consumer side only.
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        (head != tail).then(|| self.slots[head % self.capacity()].load(Ordering::Relaxed))
    }

    /// Move up to `buf.len()` queued bytes into `buf`. Consumer side only.
    pub fn read_into(&self, buf: &mut [u8]) -> usize {
        let mut read = 0;
        for slot in buf.iter_mut() {
            let Some(byte) = self.pop() else { break };
            *slot = byte;
            read += 1;
        }
        read
    }

    fn distance(&self, head: usize, tail: usize) -> usize {
        let span = 2 * self.capacity();
        (tail + span - head) % span
    }

    fn advance(&self, index: usize) -> usize {
        let next = index + 1;
        if next == 2 * self.capacity() { 0 } else { next }
    }
}
