//! Adapter configuration.
//!
//! [`AdapterConfig`] replaces compile-time buffer sizing with a runtime
//! struct validated once in [`StreamAdapterBuilder::begin`]. Buffers are
//! allocated from the validated values and never grow afterwards.
//!
//! [`StreamAdapterBuilder::begin`]: crate::adapter::StreamAdapterBuilder::begin

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    error::TransportError,
    transport::{ChecksumMode, TransportSettings},
};


/// Default payload bytes per frame.
pub const DEFAULT_MTU: usize = 64;
/// Default transport window, the largest a 3-bit sequence field allows.
pub const DEFAULT_WINDOW_SIZE: u8 = 7;
/// Default number of window slots kept free by the backpressure gate.
pub const DEFAULT_SAFETY_MARGIN: usize = 2;
/// Default retransmission attempts. Noisy lines need more than two.
pub const DEFAULT_RETRY_COUNT: u8 = 5;
/// Default delay between retransmissions.
pub const DEFAULT_RETRY_TIMEOUT: Duration = Duration::from_millis(200);
/// Default bound on how long a write may spend draining a full buffer.
pub const DEFAULT_WRITE_WAIT_BUDGET: Duration = Duration::from_secs(1);

/// How the adapter's pumps are scheduled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PumpMode {
    /// One context calls [`tick`](crate::adapter::StreamAdapter::tick).
    #[default]
    Cooperative,
    /// One context loops
    /// [`service_transmit`](crate::adapter::StreamAdapter::service_transmit)
    /// while another loops
    /// [`service_receive`](crate::adapter::StreamAdapter::service_receive).
    Split,
}

/// Runtime configuration for a [`StreamAdapter`](crate::adapter::StreamAdapter).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Maximum payload bytes packed into one outbound frame.
    pub mtu: usize,
    /// Frames the transport may keep in flight.
    pub window_size: u8,
    /// Frame integrity check requested from the transport.
    pub checksum: ChecksumMode,
    /// Transport retransmission attempts.
    pub retry_count: u8,
    /// Transport retransmission delay.
    pub retry_timeout: Duration,
    /// How long a partial frame may wait before it is handed off.
    ///
    /// Zero hands off partial frames on the next tick.
    pub idle_flush_timeout: Duration,
    /// Upper bound on the time a write spends draining a full buffer.
    pub write_wait_budget: Duration,
    /// Window slots the backpressure gate keeps free.
    pub safety_margin: usize,
    /// Consecutive terminal handoff failures after which a frame is dropped.
    pub max_fatal_failures: u32,
    /// Inbound queue size in frames; `None` uses the window size.
    pub rx_queue_frames: Option<usize>,
    /// Wait budget of the read primitive bound to the serial port.
    pub rx_timeout: Duration,
    /// Wait budget of the write primitive bound to the serial port.
    pub tx_timeout: Duration,
    /// Pump scheduling.
    pub mode: PumpMode,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            mtu: DEFAULT_MTU,
            window_size: DEFAULT_WINDOW_SIZE,
            checksum: ChecksumMode::default(),
            retry_count: DEFAULT_RETRY_COUNT,
            retry_timeout: DEFAULT_RETRY_TIMEOUT,
            idle_flush_timeout: Duration::ZERO,
            write_wait_budget: DEFAULT_WRITE_WAIT_BUDGET,
            safety_margin: DEFAULT_SAFETY_MARGIN,
            max_fatal_failures: 1,
            rx_queue_frames: None,
            rx_timeout: Duration::ZERO,
            tx_timeout: Duration::ZERO,
            mode: PumpMode::Cooperative,
        }
    }
}

/// Errors detected while validating an [`AdapterConfig`] or configuring the
/// transport.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The MTU was zero.
    #[error("mtu must be at least 1 byte")]
    ZeroMtu,
    /// The MTU does not fit in the transport's frame buffers.
    #[error("mtu {mtu} exceeds transport frame capacity {max}")]
    MtuTooLarge {
        /// Requested MTU.
        mtu: usize,
        /// Transport frame capacity.
        max: usize,
    },
    /// The window size is zero or above what the transport supports.
    #[error("window size {window} must be between 1 and {max}")]
    InvalidWindow {
        /// Requested window.
        window: u8,
        /// Largest window the transport supports.
        max: u8,
    },
    /// The safety margin would leave no slot for new frames.
    #[error("safety margin {margin} must be smaller than window size {window}")]
    MarginTooLarge {
        /// Requested margin.
        margin: usize,
        /// Requested window.
        window: u8,
    },
    /// The inbound queue would hold no frames.
    #[error("inbound queue must hold at least one frame")]
    ZeroQueueFrames,
    /// The inbound queue size overflows `usize`.
    #[error("inbound queue of {frames} frames of {mtu} bytes is too large")]
    QueueTooLarge {
        /// Requested frames.
        frames: usize,
        /// Requested MTU.
        mtu: usize,
    },
    /// The fatal failure threshold was zero.
    #[error("max_fatal_failures must be at least 1")]
    ZeroFatalThreshold,
    /// The transport rejected the settings.
    #[error("transport rejected configuration: {0}")]
    Transport(#[from] TransportError),
}

impl AdapterConfig {
    /// Set the MTU.
    #[must_use]
    pub fn with_mtu(mut self, mtu: usize) -> Self {
        self.mtu = mtu;
        self
    }

    /// Set the transport window size.
    #[must_use]
    pub fn with_window_size(mut self, window_size: u8) -> Self {
        self.window_size = window_size;
        self
    }

    /// Set the checksum mode.
    #[must_use]
    pub fn with_checksum(mut self, checksum: ChecksumMode) -> Self {
        self.checksum = checksum;
        self
    }

    /// Set the retransmission policy.
    #[must_use]
    pub fn with_retries(mut self, count: u8, timeout: Duration) -> Self {
        self.retry_count = count;
        self.retry_timeout = timeout;
        self
    }

    /// Set the idle-flush timeout.
    #[must_use]
    pub fn with_idle_flush_timeout(mut self, timeout: Duration) -> Self {
        self.idle_flush_timeout = timeout;
        self
    }

    /// Set the write wait budget.
    #[must_use]
    pub fn with_write_wait_budget(mut self, budget: Duration) -> Self {
        self.write_wait_budget = budget;
        self
    }

    /// Set the number of window slots kept free.
    #[must_use]
    pub fn with_safety_margin(mut self, margin: usize) -> Self {
        self.safety_margin = margin;
        self
    }

    /// Set the consecutive terminal failure threshold.
    #[must_use]
    pub fn with_max_fatal_failures(mut self, failures: u32) -> Self {
        self.max_fatal_failures = failures;
        self
    }

    /// Size the inbound queue in frames.
    #[must_use]
    pub fn with_rx_queue_frames(mut self, frames: usize) -> Self {
        self.rx_queue_frames = Some(frames);
        self
    }

    /// Set the bounded wait of the port read and write primitives.
    #[must_use]
    pub fn with_io_timeouts(mut self, rx: Duration, tx: Duration) -> Self {
        self.rx_timeout = rx;
        self.tx_timeout = tx;
        self
    }

    /// Select the pump scheduling mode.
    #[must_use]
    pub fn with_mode(mut self, mode: PumpMode) -> Self {
        self.mode = mode;
        self
    }

    /// Inbound queue capacity in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::QueueTooLarge`] when the product overflows.
    pub fn rx_queue_capacity(&self) -> Result<usize, ConfigError> {
        let frames = self
            .rx_queue_frames
            .unwrap_or(usize::from(self.window_size));
        frames
            .checked_mul(self.mtu)
            .and_then(|bytes| bytes.checked_mul(4).map(|_| bytes))
            .ok_or(ConfigError::QueueTooLarge {
                frames,
                mtu: self.mtu,
            })
    }

    /// Check the configuration against the transport's limits.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self, max_frame_size: usize, max_window: u8) -> Result<(), ConfigError> {
        if self.mtu == 0 {
            return Err(ConfigError::ZeroMtu);
        }
        if self.mtu > max_frame_size {
            return Err(ConfigError::MtuTooLarge {
                mtu: self.mtu,
                max: max_frame_size,
            });
        }
        if self.window_size == 0 || self.window_size > max_window {
            return Err(ConfigError::InvalidWindow {
                window: self.window_size,
                max: max_window,
            });
        }
        if self.safety_margin >= usize::from(self.window_size) {
            return Err(ConfigError::MarginTooLarge {
                margin: self.safety_margin,
                window: self.window_size,
            });
        }
        if self.rx_queue_frames == Some(0) {
            return Err(ConfigError::ZeroQueueFrames);
        }
        if self.max_fatal_failures == 0 {
            return Err(ConfigError::ZeroFatalThreshold);
        }
        self.rx_queue_capacity().map(|_| ())
    }

    /// Settings forwarded to [`FramedTransport::configure`](crate::transport::FramedTransport::configure).
    #[must_use]
    pub fn transport_settings(&self) -> TransportSettings {
        TransportSettings {
            checksum: self.checksum,
            window_size: self.window_size,
            retry_count: self.retry_count,
            retry_timeout: self.retry_timeout,
        }
    }
}
