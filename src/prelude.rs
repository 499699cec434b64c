//! Optional convenience imports for common adapter workflows.
//!
//! Prefer importing specialised APIs directly from their owning modules.
//!
//! # Examples
//!
//! ```rust,no_run
//! use serialframe::prelude::*;
//!
//! fn config() -> AdapterConfig { AdapterConfig::default().with_mode(PumpMode::Split) }
//! ```

pub use crate::{
    adapter::StreamAdapter,
    config::{AdapterConfig, ConfigError, PumpMode},
    diagnostics::{Diagnostic, DiagnosticSink},
    error::TransportError,
    port::SerialPort,
    transport::{FramedTransport, LinkStatus, WindowTelemetry},
};
