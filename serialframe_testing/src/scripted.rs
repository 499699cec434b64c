//! Transport double whose behaviour is dictated by the test.

use std::{
    collections::VecDeque,
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};

use bytes::Bytes;
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

#[derive(Debug)]
struct Script {
    settings: Option<TransportSettings>,
    configure_error: Option<TransportError>,
    write_results: VecDeque<Result<(), TransportError>>,
    pump_errors: VecDeque<TransportError>,
    written: Vec<Bytes>,
    status: LinkStatus,
    telemetry: WindowTelemetry,
}

/// Fake [`FramedTransport`] with scripted telemetry and write results.
///
/// Accepted frames are recorded. The pumps do no I/O beyond counting their
/// invocations, unless a pump error has been scripted.
pub struct ScriptedTransport {
    max_frame_size: usize,
    max_window: u8,
    script: Mutex<Script>,
    callback: Mutex<Option<ReceiveCallback>>,
    receive_runs: AtomicUsize,
    transmit_runs: AtomicUsize,
}

impl ScriptedTransport {
    /// Create a connected transport with an idle seven-frame window.
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            max_frame_size,
            max_window: 7,
            script: Mutex::new(Script {
                settings: None,
                configure_error: None,
                write_results: VecDeque::new(),
                pump_errors: VecDeque::new(),
                written: Vec::new(),
                status: LinkStatus::Connected,
                telemetry: WindowTelemetry {
                    last_sent_seq: 0,
                    last_confirmed_seq: 0,
                    max_in_flight: 7,
                    sequence_space: 8,
                },
            }),
            callback: Mutex::new(None),
            receive_runs: AtomicUsize::new(0),
            transmit_runs: AtomicUsize::new(0),
        }
    }

    /// Advertise `max_window` as the largest supported window.
    #[must_use]
    pub fn with_max_window(mut self, max_window: u8) -> Self {
        self.max_window = max_window;
        self
    }

    /// Reject the next [`configure`](FramedTransport::configure) call.
    pub fn fail_configure(&self, error: TransportError) {
        self.script().configure_error = Some(error);
    }

    /// Queue results for upcoming writes; writes succeed once exhausted.
    pub fn script_writes(&self, results: impl IntoIterator<Item = Result<(), TransportError>>) {
        self.script().write_results.extend(results);
    }

    /// Queue an error for the next pump invocation in either direction.
    pub fn fail_next_pump(&self, error: TransportError) { self.script().pump_errors.push_back(error); }

    /// Report `busy` unconfirmed frames out of `max_in_flight`.
    pub fn set_window(&self, busy: u32, max_in_flight: usize) {
        let mut script = self.script();
        let confirmed = script.telemetry.last_confirmed_seq;
        script.telemetry.last_sent_seq = confirmed.wrapping_add(busy);
        script.telemetry.max_in_flight = max_in_flight;
    }

    /// Replace the reported telemetry wholesale.
    pub fn set_telemetry(&self, telemetry: WindowTelemetry) { self.script().telemetry = telemetry; }

    /// Force the reported link state.
    pub fn set_status(&self, status: LinkStatus) { self.script().status = status; }

    /// Settings received through `configure`, if any.
    pub fn settings(&self) -> Option<TransportSettings> { self.script().settings }

    /// Frames accepted so far.
    pub fn written(&self) -> Vec<Bytes> { self.script().written.clone() }

    /// Number of receive pump invocations.
    pub fn receive_runs(&self) -> usize { self.receive_runs.load(Ordering::Relaxed) }

    /// Number of transmit pump invocations.
    pub fn transmit_runs(&self) -> usize { self.transmit_runs.load(Ordering::Relaxed) }

    /// Hand `frame` to the registered receive callback.
    ///
    /// Returns `false` when no callback is registered.
    pub fn deliver(&self, frame: &[u8]) -> bool {
        let callback = self.callback.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(callback) = callback.as_ref() else {
            return false;
        };
        callback(frame);
        true
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pump_result(&self) -> Result<(), TransportError> {
        self.script().pump_errors.pop_front().map_or(Ok(()), Err)
    }
}

impl FramedTransport for ScriptedTransport {
    fn configure(&self, settings: &TransportSettings) -> Result<(), TransportError> {
        let mut script = self.script();
        if let Some(error) = script.configure_error.take() {
            return Err(error);
        }
        script.settings = Some(*settings);
        Ok(())
    }

    fn max_frame_size(&self) -> usize { self.max_frame_size }

    fn max_window_size(&self) -> u8 { self.max_window }

    fn set_receive_callback(&self, callback: ReceiveCallback) {
        *self.callback.lock().unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    fn write(&self, frame: &[u8]) -> Result<(), TransportError> {
        let mut script = self.script();
        let result = script.write_results.pop_front().unwrap_or(Ok(()));
        if result.is_ok() {
            script.written.push(Bytes::copy_from_slice(frame));
        }
        result
    }

    fn run_receive_pump(&self, _read: &mut ReadFn<'_>) -> Result<(), TransportError> {
        self.receive_runs.fetch_add(1, Ordering::Relaxed);
        self.pump_result()
    }

    fn run_transmit_pump(&self, _write: &mut WriteFn<'_>) -> Result<(), TransportError> {
        self.transmit_runs.fetch_add(1, Ordering::Relaxed);
        self.pump_result()
    }

    fn status(&self) -> LinkStatus { self.script().status }

    fn window_telemetry(&self) -> WindowTelemetry { self.script().telemetry }
}
