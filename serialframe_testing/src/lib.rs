//! Test doubles for driving a [`StreamAdapter`](serialframe::StreamAdapter)
//! without hardware.
//!
//! [`MemoryPort::pair`] gives two ends of an in-memory serial line and
//! [`LoopbackTransport`] is a lossless reference transport running over it,
//! so two adapters can talk to each other inside one test.
//! [`ScriptedTransport`] instead lets a test dictate window telemetry, link
//! status and write results directly.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use serialframe::{AdapterConfig, StreamAdapter};
//! use serialframe_testing::{LoopbackTransport, MemoryPort};
//!
//! let (left, right) = MemoryPort::pair();
//! let a = StreamAdapter::builder(AdapterConfig::default())
//!     .begin(Arc::new(LoopbackTransport::new(64)), Arc::new(left))
//!     .expect("start a");
//! let b = StreamAdapter::builder(AdapterConfig::default())
//!     .begin(Arc::new(LoopbackTransport::new(64)), Arc::new(right))
//!     .expect("start b");
//!
//! a.write(b"ping");
//! a.tick(); // hands the frame to the transport
//! a.tick(); // transmit pump puts it on the line
//! b.tick();
//! assert_eq!(b.available(), 4);
//! ```

pub mod clock;
pub mod fault;
pub mod logging;
pub mod loopback;
pub mod port;
pub mod scripted;
pub mod sink;

pub use clock::ManualClock;
pub use fault::EveryNthFault;
pub use logging::{LoggerHandle, logger};
pub use loopback::LoopbackTransport;
pub use port::MemoryPort;
pub use scripted::ScriptedTransport;
pub use sink::RecordingSink;
