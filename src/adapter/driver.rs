//! Pump servicing and frame handoff.

use std::time::Duration;

use tracing::{debug, trace};

use super::StreamAdapter;
use crate::{
    backpressure::GateDecision,
    diagnostics::{Diagnostic, PumpDirection},
    error::TransportError,
    metrics::{self, Direction},
    outbound::OutboundFrame,
    port::{self, SerialPort},
    transport::{FramedTransport, LinkStatus},
};

impl<T, P> StreamAdapter<T, P>
where
    T: FramedTransport,
    P: SerialPort,
{
    /// Service both directions once from a single context.
    ///
    /// Runs the tick observer, the receive pump when the port has data, the
    /// transmit pump, and finally attempts to hand off the outbound frame.
    /// Errors never propagate; terminal ones reach the diagnostic sink.
    pub fn tick(&self) { self.tick_within(Duration::MAX); }

    /// Receive-side share of [`tick`](Self::tick) for split scheduling.
    pub fn service_receive(&self) {
        self.observe_tick();
        self.pump_receive(self.config.rx_timeout);
        self.try_handoff();
    }

    /// Transmit-side share of [`tick`](Self::tick) for split scheduling.
    pub fn service_transmit(&self) { self.pump_transmit(self.config.tx_timeout); }

    /// Run one tick with port I/O bounded by `limit` as well as the
    /// configured timeouts.
    pub(super) fn tick_within(&self, limit: Duration) {
        self.observe_tick();
        self.pump_receive(self.config.rx_timeout.min(limit));
        self.pump_transmit(self.config.tx_timeout.min(limit));
        self.try_handoff();
    }

    fn observe_tick(&self) {
        if let Some(observer) = &self.tick_observer {
            observer();
        }
    }

    fn pump_receive(&self, timeout: Duration) {
        if self.port.bytes_available() == 0 {
            return;
        }
        let mut read =
            |buf: &mut [u8]| port::faulty_read(&*self.port, &*self.faults, buf, timeout);
        if let Err(error) = self.transport.run_receive_pump(&mut read) {
            self.report_pump_error(PumpDirection::Receive, error);
        }
    }

    fn pump_transmit(&self, timeout: Duration) {
        let mut write = |buf: &[u8]| port::faulty_write(&*self.port, &*self.faults, buf, timeout);
        if let Err(error) = self.transport.run_transmit_pump(&mut write) {
            self.report_pump_error(PumpDirection::Transmit, error);
        }
    }

    fn report_pump_error(&self, direction: PumpDirection, error: TransportError) {
        if error.is_transient() {
            debug!(direction = direction.as_str(), %error, "transport pump interrupted");
            return;
        }
        self.stats.record_transport_error();
        metrics::inc_transport_errors();
        self.sink.record(&Diagnostic::PumpFault { direction, error });
    }

    /// Hand the outbound frame to the transport if it is ready and the
    /// window has room.
    pub(super) fn try_handoff(&self) {
        let mut frame = self.outbound();
        let readiness = frame.readiness(self.clock.now(), self.config.idle_flush_timeout);
        if !readiness.is_candidate() {
            return;
        }
        let status = self.transport.status();
        if status != LinkStatus::Connected {
            trace!(?status, "handoff skipped; link not connected");
            frame.reset_fatal_failures();
            return;
        }
        if let GateDecision::Deferred {
            busy,
            max_in_flight,
        } = self.gate.admit(&self.transport.window_telemetry())
        {
            trace!(busy, max_in_flight, len = frame.len(), "handoff deferred by backpressure");
            frame.reset_fatal_failures();
            self.stats.record_deferral();
            metrics::inc_deferrals();
            return;
        }

        let len = frame.len();
        match self.transport.write(frame.bytes()) {
            Ok(()) => {
                debug!(len, ?readiness, "frame handed off");
                self.stats.record_handoff(len);
                metrics::inc_frames(Direction::Outbound);
                frame.clear();
            }
            Err(error) if error.is_transient() => {
                trace!(len, %error, "handoff retried next tick");
                frame.reset_fatal_failures();
            }
            Err(error) => self.handle_fatal(&mut frame, error),
        }
    }

    fn handle_fatal(&self, frame: &mut OutboundFrame, error: TransportError) {
        self.stats.record_transport_error();
        metrics::inc_transport_errors();
        self.sink.record(&Diagnostic::TransportFault {
            error: error.clone(),
        });
        if frame.record_fatal_failure() < self.config.max_fatal_failures {
            return;
        }
        let len = frame.len();
        frame.clear();
        self.stats.record_drop();
        metrics::inc_dropped_frames();
        self.sink.record(&Diagnostic::FrameDropped { len, error });
    }
}
