//! Builder for [`StreamAdapter`].

use std::{
    marker::PhantomData,
    sync::{Arc, Mutex},
};

use tracing::info;

use super::{StreamAdapter, TickObserver};
use crate::{
    backpressure::BackpressureGate,
    clock::{Clock, MonotonicClock},
    config::{AdapterConfig, ConfigError},
    diagnostics::{AdapterStats, Diagnostic, DiagnosticSink, TracingSink},
    fault::{FaultInjector, NoFaults},
    inbound::InboundQueue,
    metrics::{self, Direction},
    outbound::OutboundFrame,
    port::SerialPort,
    transport::{FramedTransport, ReceiveCallback},
};

/// Builder for [`StreamAdapter`].
///
/// Defaults use the system monotonic clock, log diagnostics through
/// [`TracingSink`] and inject no faults. Construct via
/// [`StreamAdapter::builder`].
pub struct StreamAdapterBuilder<T, P> {
    config: AdapterConfig,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn DiagnosticSink>,
    faults: Arc<dyn FaultInjector>,
    tick_observer: Option<TickObserver>,
    _marker: PhantomData<fn() -> (T, P)>,
}

impl<T, P> StreamAdapterBuilder<T, P>
where
    T: FramedTransport,
    P: SerialPort,
{
    pub(super) fn new(config: AdapterConfig) -> Self {
        Self {
            config,
            clock: Arc::new(MonotonicClock),
            sink: Arc::new(TracingSink),
            faults: Arc::new(NoFaults),
            tick_observer: None,
            _marker: PhantomData,
        }
    }

    /// Use `clock` for timestamps and wait budgets.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Send diagnostic events to `sink`.
    #[must_use]
    pub fn diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Pass every port transfer through `faults`.
    #[must_use]
    pub fn fault_injector(mut self, faults: Arc<dyn FaultInjector>) -> Self {
        self.faults = faults;
        self
    }

    /// Invoke `observer` at the start of every tick and receive service.
    #[must_use]
    pub fn on_tick<F>(mut self, observer: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.tick_observer = Some(Box::new(observer));
        self
    }

    /// Validate the configuration, configure `transport` and register the
    /// inbound delivery callback.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the configuration does not fit the
    /// transport or the transport rejects its settings. Nothing is
    /// registered with the transport in that case.
    pub fn begin(self, transport: Arc<T>, port: Arc<P>) -> Result<StreamAdapter<T, P>, ConfigError> {
        let Self {
            config,
            clock,
            sink,
            faults,
            tick_observer,
            _marker,
        } = self;

        config.validate(transport.max_frame_size(), transport.max_window_size())?;
        let rx_capacity = config.rx_queue_capacity()?;
        transport.configure(&config.transport_settings())?;

        let inbound = Arc::new(InboundQueue::with_capacity(rx_capacity));
        transport.set_receive_callback(deliver_into(Arc::clone(&inbound), Arc::clone(&sink)));

        info!(
            mtu = config.mtu,
            window = config.window_size,
            rx_capacity,
            mode = ?config.mode,
            "stream adapter started"
        );

        Ok(StreamAdapter {
            transport,
            port,
            outbound: Mutex::new(OutboundFrame::with_capacity(config.mtu)),
            inbound,
            gate: BackpressureGate::new(config.safety_margin),
            config,
            clock,
            sink,
            faults,
            tick_observer,
            stats: AdapterStats::default(),
        })
    }
}

/// Build the callback copying delivered frames into `queue`.
fn deliver_into(queue: Arc<InboundQueue>, sink: Arc<dyn DiagnosticSink>) -> ReceiveCallback {
    Box::new(move |frame: &[u8]| {
        metrics::inc_frames(Direction::Inbound);
        let dropped = queue.push_frame(frame);
        if dropped > 0 {
            metrics::add_dropped_bytes(dropped);
            sink.record(&Diagnostic::InboundOverflow {
                dropped,
                total: queue.overflow_count(),
            });
        }
    })
}
