#![cfg(not(loom))]
//! Inbound overflow accounting and its diagnostics.

use std::sync::Arc;

use log::Level;
use rstest::rstest;
use serial_test::serial;
use serialframe::{AdapterConfig, Diagnostic, StreamAdapter};
use serialframe_testing::{LoggerHandle, MemoryPort, RecordingSink, ScriptedTransport, logger};

fn adapter_with(
    queue_frames: usize,
    sink: Option<Arc<RecordingSink>>,
) -> (StreamAdapter<ScriptedTransport, MemoryPort>, Arc<ScriptedTransport>) {
    let transport = Arc::new(ScriptedTransport::new(64));
    let (port, _peer) = MemoryPort::pair();
    let mut builder =
        StreamAdapter::builder(AdapterConfig::default().with_mtu(4).with_rx_queue_frames(queue_frames));
    if let Some(sink) = sink {
        builder = builder.diagnostics(sink);
    }
    let adapter = builder
        .begin(Arc::clone(&transport), Arc::new(port))
        .expect("adapter should start");
    (adapter, transport)
}

#[rstest]
#[case::exact_fit(b"abcdefgh", 0)]
#[case::one_over(b"abcdefghi", 1)]
#[case::far_over(b"abcdefghijklmnop", 8)]
fn overflow_counts_exact_excess(#[case] frame: &[u8], #[case] excess: u64) {
    let sink = Arc::new(RecordingSink::default());
    let (adapter, transport) = adapter_with(2, Some(Arc::clone(&sink)));
    assert!(transport.deliver(frame));

    assert_eq!(adapter.stats().rx_overflow_bytes, excess);
    assert_eq!(adapter.available(), 8);
    let mut buf = [0u8; 16];
    let n = adapter.read_into(&mut buf);
    assert_eq!(&buf[..n], &frame[..8]);
    assert_eq!(
        sink.count(|event| matches!(event, Diagnostic::InboundOverflow { .. })),
        usize::from(excess > 0)
    );
}

#[rstest]
fn queued_bytes_survive_later_overflow() {
    let sink = Arc::new(RecordingSink::default());
    let (adapter, transport) = adapter_with(1, Some(Arc::clone(&sink)));
    transport.deliver(b"keep");
    transport.deliver(b"lost");
    transport.deliver(b"gone");

    assert_eq!(adapter.read(), Some(b'k'));
    transport.deliver(b"Z!");
    let mut buf = [0u8; 8];
    let n = adapter.read_into(&mut buf);
    assert_eq!(&buf[..n], b"eepZ");
    assert_eq!(adapter.stats().rx_overflow_bytes, 9);
    assert_eq!(
        sink.take(),
        vec![
            Diagnostic::InboundOverflow {
                dropped: 4,
                total: 4
            },
            Diagnostic::InboundOverflow {
                dropped: 4,
                total: 8
            },
            Diagnostic::InboundOverflow {
                dropped: 1,
                total: 9
            },
        ]
    );
}

#[rstest]
#[serial(adapter_logs)]
fn default_sink_logs_overflow_warning(mut logger: LoggerHandle) {
    let (adapter, transport) = adapter_with(1, None);
    logger.clear();

    transport.deliver(b"abcdef");
    assert_eq!(adapter.stats().rx_overflow_bytes, 2);

    let found = logger
        .drain()
        .iter()
        .any(|(level, message)| *level == Level::Warn && message.contains("inbound queue overflow"));
    assert!(found, "overflow warning not logged");
}
