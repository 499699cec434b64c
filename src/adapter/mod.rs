//! Byte-stream adapter over a reliable framed transport.
//!
//! [`StreamAdapter`] exposes a serial-style byte interface to the
//! application. Written bytes are packed into frames of at most
//! [`AdapterConfig::mtu`] bytes and handed to the transport when the flush
//! policy and the backpressure gate allow it. Frames delivered by the
//! transport are unpacked into a bounded inbound queue read one byte at a
//! time.
//!
//! All methods take `&self`; share the adapter through an
//! [`Arc`](std::sync::Arc) when application writes and pump servicing run on
//! different threads.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread,
    time::{Duration, Instant},
};

use tracing::debug;

use crate::{
    backpressure::BackpressureGate,
    clock::Clock,
    config::{AdapterConfig, PumpMode},
    diagnostics::{AdapterStats, DiagnosticSink, StatsSnapshot},
    fault::FaultInjector,
    inbound::InboundQueue,
    outbound::OutboundFrame,
    port::SerialPort,
    transport::FramedTransport,
};

mod builder;
mod driver;
mod io;

pub use builder::StreamAdapterBuilder;

/// Consecutive drain attempts without clock progress before a write gives up.
const MAX_STALLED_DRAINS: u32 = 64;

/// Hook invoked at the start of every receive-side tick.
pub type TickObserver = Box<dyn Fn() + Send + Sync>;

/// Serial-style byte stream carried by a [`FramedTransport`].
pub struct StreamAdapter<T, P> {
    transport: Arc<T>,
    port: Arc<P>,
    outbound: Mutex<OutboundFrame>,
    inbound: Arc<InboundQueue>,
    gate: BackpressureGate,
    config: AdapterConfig,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn DiagnosticSink>,
    faults: Arc<dyn FaultInjector>,
    tick_observer: Option<TickObserver>,
    stats: AdapterStats,
}

impl<T, P> StreamAdapter<T, P>
where
    T: FramedTransport,
    P: SerialPort,
{
    /// Start configuring an adapter.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use std::sync::Arc;
    ///
    /// use serialframe::{AdapterConfig, StreamAdapter};
    ///
    /// let adapter = StreamAdapter::builder(AdapterConfig::default().with_mtu(32))
    ///     .begin(Arc::new(transport), Arc::new(port))?;
    /// adapter.write(b"hello");
    /// adapter.flush();
    /// adapter.tick();
    /// ```
    #[must_use]
    pub fn builder(config: AdapterConfig) -> StreamAdapterBuilder<T, P> {
        StreamAdapterBuilder::new(config)
    }

    /// Append one byte to the outbound frame.
    ///
    /// When the frame is full, drain attempts are made until space frees up
    /// or [`AdapterConfig::write_wait_budget`] elapses on the adapter's
    /// clock. In cooperative mode a drain attempt is a full [`tick`] whose
    /// port I/O is bounded by the budget still remaining; in split mode it
    /// only retries the handoff, leaving the pumps to their own contexts. At
    /// least one attempt is always made.
    ///
    /// If the clock does not advance across 64 consecutive attempts the
    /// write gives up, so a manually driven clock cannot hang the caller.
    ///
    /// Returns `false` if the byte could not be buffered.
    ///
    /// [`tick`]: Self::tick
    pub fn write_byte(&self, byte: u8) -> bool { self.push_with_drain(byte, self.clock.now()) }

    /// Append `data` to the outbound stream, returning the number of bytes
    /// accepted.
    ///
    /// Stops at the first byte that cannot be buffered. The write wait
    /// budget is shared by the whole call and only bounds drain attempts:
    /// bytes that fit in the current frame are always accepted, however long
    /// earlier drains took.
    pub fn write(&self, data: &[u8]) -> usize {
        let since = self.clock.now();
        let mut written = 0;
        for &byte in data {
            if !self.push_with_drain(byte, since) {
                break;
            }
            written += 1;
        }
        written
    }

    /// Bytes that can be written before the current frame is full.
    #[must_use]
    pub fn available_for_write(&self) -> usize { self.outbound().remaining() }

    /// Bytes waiting to be read.
    #[must_use]
    pub fn available(&self) -> usize { self.inbound.len() }

    /// Remove and return the next received byte.
    #[must_use]
    pub fn read(&self) -> Option<u8> { self.inbound.pop() }

    /// Move up to `buf.len()` received bytes into `buf`.
    pub fn read_into(&self, buf: &mut [u8]) -> usize { self.inbound.read_into(buf) }

    /// Return the next received byte without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<u8> { self.inbound.peek() }

    /// Request that the buffered bytes be handed off on the next tick,
    /// regardless of the idle timeout. Never blocks.
    pub fn flush(&self) { self.outbound().request_flush(); }

    /// Snapshot of the adapter counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats
            .snapshot(self.inbound.accepted_count(), self.inbound.overflow_count())
    }

    /// Configuration the adapter was started with.
    #[must_use]
    pub fn config(&self) -> &AdapterConfig { &self.config }

    fn outbound(&self) -> MutexGuard<'_, OutboundFrame> {
        self.outbound.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_push(&self, byte: u8) -> bool { self.outbound().push(byte, self.clock.now()) }

    fn push_with_drain(&self, byte: u8, since: Instant) -> bool {
        if self.try_push(byte) {
            return true;
        }
        let budget = self.config.write_wait_budget;
        let mut last_seen = self.clock.now();
        let mut stalled = 0;
        loop {
            let waited = last_seen.saturating_duration_since(since);
            self.drain(budget.saturating_sub(waited));
            if self.try_push(byte) {
                return true;
            }
            let now = self.clock.now();
            if now.saturating_duration_since(since) >= budget {
                return false;
            }
            if now > last_seen {
                last_seen = now;
                stalled = 0;
            } else {
                stalled += 1;
                if stalled >= MAX_STALLED_DRAINS {
                    debug!(attempts = stalled, "write drain abandoned; clock not advancing");
                    return false;
                }
            }
            if self.config.mode == PumpMode::Split {
                thread::yield_now();
            }
        }
    }

    fn drain(&self, remaining: Duration) {
        match self.config.mode {
            PumpMode::Cooperative => self.tick_within(remaining),
            PumpMode::Split => self.try_handoff(),
        }
    }
}
