#![doc(html_root_url = "https://docs.rs/serialframe/latest")]
//! Public API for the `serialframe` library.
//!
//! This crate adapts a reliable, windowed, acknowledged framed transport to
//! a serial-style byte stream. Application bytes are packed into frames,
//! handed to the transport under window backpressure, and delivered frames
//! are unpacked into a bounded inbound queue.

pub mod adapter;
pub mod backpressure;
pub mod clock;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fault;
pub mod inbound;
pub mod metrics;
pub mod outbound;
pub mod port;
pub mod prelude;
#[cfg(not(loom))]
pub mod runtime;
pub mod transport;

pub use adapter::{StreamAdapter, StreamAdapterBuilder, TickObserver};
pub use backpressure::{BackpressureGate, GateDecision};
pub use clock::{Clock, MonotonicClock};
pub use config::{AdapterConfig, ConfigError, PumpMode};
pub use diagnostics::{Diagnostic, DiagnosticSink, PumpDirection, StatsSnapshot, TracingSink};
pub use error::TransportError;
pub use fault::{FaultInjector, NoFaults};
pub use inbound::InboundQueue;
pub use metrics::{
    BACKPRESSURE_DEFERRALS,
    BYTES_DROPPED,
    Direction,
    FRAMES_DROPPED,
    FRAMES_TOTAL,
    TRANSPORT_ERRORS,
};
pub use outbound::{OutboundFrame, Readiness};
pub use port::SerialPort;
pub use transport::{
    ChecksumMode,
    FramedTransport,
    LinkStatus,
    ReadFn,
    ReceiveCallback,
    TransportSettings,
    WindowTelemetry,
    WriteFn,
};
