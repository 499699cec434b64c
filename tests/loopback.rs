#![cfg(not(loom))]
//! End-to-end tests of two adapters talking over an in-memory line.

use std::{
    io::{Read, Write},
    sync::Arc,
    time::Duration,
};

use proptest::{
    collection::vec,
    prelude::any,
    test_runner::{Config as ProptestConfig, RngAlgorithm, TestCaseError, TestRng, TestRunner},
};
use rstest::{fixture, rstest};
use serialframe::{AdapterConfig, StreamAdapter};
use serialframe_testing::{EveryNthFault, LoopbackTransport, MemoryPort};

type Adapter = StreamAdapter<LoopbackTransport, MemoryPort>;

struct Link {
    a: Adapter,
    b: Adapter,
}

impl Link {
    fn tick(&self) {
        self.a.tick();
        self.b.tick();
    }

    /// Tick both ends until `b` has `expected` bytes or the attempts run out.
    fn settle(&self, expected: usize) {
        for _ in 0..256 {
            if self.b.available() >= expected {
                return;
            }
            self.tick();
        }
    }

    fn drain_b(&self) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(byte) = self.b.read() {
            out.push(byte);
        }
        out
    }
}

fn base_config() -> AdapterConfig {
    AdapterConfig::default()
        .with_mtu(16)
        .with_rx_queue_frames(64)
        .with_write_wait_budget(Duration::ZERO)
}

#[fixture]
fn config() -> AdapterConfig { base_config() }

fn link(config: AdapterConfig) -> Link { link_with_faults(config, None) }

fn link_with_faults(config: AdapterConfig, faults: Option<Arc<EveryNthFault>>) -> Link {
    let (left, right) = MemoryPort::pair();
    let mut a = StreamAdapter::builder(config);
    if let Some(faults) = faults {
        a = a.fault_injector(faults);
    }
    let a = a
        .begin(Arc::new(LoopbackTransport::new(32)), Arc::new(left))
        .expect("start a");
    let b = StreamAdapter::builder(config)
        .begin(Arc::new(LoopbackTransport::new(32)), Arc::new(right))
        .expect("start b");
    Link { a, b }
}

#[rstest]
fn short_message_arrives_on_next_ticks(config: AdapterConfig) {
    let link = link(config);
    assert_eq!(link.a.write(b"hello"), 5);
    link.tick();
    link.tick();
    assert_eq!(link.drain_b(), b"hello");
}

#[rstest]
fn long_message_is_split_into_frames_and_reassembled(config: AdapterConfig) {
    let link = link(config);
    let payload: Vec<u8> = (0..=255u8).cycle().take(200).collect();

    let mut offset = 0;
    while offset < payload.len() {
        offset += link.a.write(&payload[offset..]);
        link.tick();
    }
    link.a.flush();
    link.settle(payload.len());

    assert_eq!(link.drain_b(), payload);
    let stats = link.a.stats();
    assert_eq!(stats.bytes_sent, 200);
    assert_eq!(stats.frames_sent, 13);
    assert_eq!(link.b.stats().rx_overflow_bytes, 0);
}

#[rstest]
fn both_directions_flow_independently(config: AdapterConfig) {
    let link = link(config);
    link.a.write(b"ping");
    link.b.write(b"pong");
    link.tick();
    link.tick();

    assert_eq!(link.drain_b(), b"ping");
    let mut buf = [0u8; 8];
    let n = link.a.read_into(&mut buf);
    assert_eq!(&buf[..n], b"pong");
}

#[rstest]
fn stalled_port_writes_only_delay_delivery(config: AdapterConfig) {
    let faults = Arc::new(EveryNthFault::stall_writes(2));
    let link = link_with_faults(config, Some(Arc::clone(&faults)));
    let message = b"the quick brown fox jumps over the lazy dog";

    let mut offset = 0;
    while offset < message.len() {
        offset += link.a.write(&message[offset..]);
        link.tick();
    }
    link.a.flush();
    link.settle(message.len());

    assert!(faults.injected() > 0);
    assert_eq!(link.drain_b(), message);
}

#[rstest]
fn io_traits_carry_bytes(config: AdapterConfig) {
    let link = link(config);
    let mut writer = &link.a;
    writer.write_all(b"via io").expect("write_all");
    Write::flush(&mut writer).expect("flush");
    link.tick();
    link.tick();

    let mut reader = &link.b;
    let mut buf = [0u8; 16];
    let n = Read::read(&mut reader, &mut buf).expect("read");
    assert_eq!(&buf[..n], b"via io");
}

fn deterministic_runner(cases: u32) -> TestRunner {
    let config = ProptestConfig {
        cases,
        ..ProptestConfig::default()
    };
    TestRunner::new_with_rng(config, TestRng::deterministic_rng(RngAlgorithm::ChaCha))
}

#[test]
fn arbitrary_writes_arrive_in_order() {
    let mut runner = deterministic_runner(64);
    runner
        .run(&vec(vec(any::<u8>(), 0..40), 1..8), |chunks| {
            let link = link(base_config());
            let mut expected = Vec::new();
            for chunk in &chunks {
                let mut offset = 0;
                while offset < chunk.len() {
                    offset += link.a.write(&chunk[offset..]);
                    link.tick();
                }
                expected.extend_from_slice(chunk);
            }
            link.a.flush();
            link.settle(expected.len());
            let received = link.drain_b();
            if received != expected {
                return Err(TestCaseError::fail(format!(
                    "received {} bytes, expected {}",
                    received.len(),
                    expected.len()
                )));
            }
            Ok(())
        })
        .expect("round trip property");
}
