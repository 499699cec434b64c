//! Tests for the inbound SPSC byte queue.

#[cfg(not(loom))]
mod unit {
    use proptest::{
        collection::vec,
        prelude::any,
        prop_assert_eq,
        test_runner::{Config as ProptestConfig, RngAlgorithm, TestRng, TestRunner},
    };
    use rstest::{fixture, rstest};

    use crate::inbound::InboundQueue;

    #[fixture]
    fn queue() -> InboundQueue { InboundQueue::with_capacity(8) }

    fn deterministic_runner(cases: u32) -> TestRunner {
        let config = ProptestConfig {
            cases,
            ..ProptestConfig::default()
        };
        TestRunner::new_with_rng(config, TestRng::deterministic_rng(RngAlgorithm::ChaCha))
    }

    #[rstest]
    fn empty_queue_reads_nothing(queue: InboundQueue) {
        assert!(queue.is_empty());
        assert_eq!(queue.pop(), None);
        assert_eq!(queue.peek(), None);
    }

    #[rstest]
    fn preserves_frame_order(queue: InboundQueue) {
        assert_eq!(queue.push_frame(b"abc"), 0);
        assert_eq!(queue.push_frame(b"de"), 0);
        assert_eq!(queue.len(), 5);

        let mut out = [0u8; 8];
        let read = queue.read_into(&mut out);
        assert_eq!(&out[..read], b"abcde");
        assert!(queue.is_empty());
    }

    #[rstest]
    fn peek_does_not_consume(queue: InboundQueue) {
        queue.push_frame(b"xy");
        assert_eq!(queue.peek(), Some(b'x'));
        assert_eq!(queue.peek(), Some(b'x'));
        assert_eq!(queue.pop(), Some(b'x'));
        assert_eq!(queue.peek(), Some(b'y'));
        assert_eq!(queue.len(), 1);
    }

    #[rstest]
    fn overflow_counts_exact_excess_and_keeps_queued_bytes(queue: InboundQueue) {
        assert_eq!(queue.push_frame(b"0123456"), 0);
        let dropped = queue.push_frame(b"789AB");
        assert_eq!(dropped, 4);
        assert_eq!(queue.overflow_count(), 4);
        assert_eq!(queue.accepted_count(), 8);

        let mut out = [0u8; 16];
        let read = queue.read_into(&mut out);
        assert_eq!(&out[..read], b"01234567");
    }

    #[rstest]
    fn wraps_around_repeatedly(queue: InboundQueue) {
        for round in 0u8..20 {
            let frame = [round, round.wrapping_add(1), round.wrapping_add(2)];
            assert_eq!(queue.push_frame(&frame), 0);
            let mut out = [0u8; 3];
            assert_eq!(queue.read_into(&mut out), 3);
            assert_eq!(out, frame);
        }
        assert_eq!(queue.overflow_count(), 0);
    }

    #[rstest]
    #[case(1)]
    #[case(5)]
    #[case(64)]
    fn interleaved_pushes_and_pops_match_a_fifo_model(#[case] capacity: usize) {
        let mut runner = deterministic_runner(64);
        let strategy = vec((any::<bool>(), any::<u8>()), 0..256);

        runner
            .run(&strategy, |ops| {
                let queue = InboundQueue::with_capacity(capacity);
                let mut model = std::collections::VecDeque::new();
                let mut dropped = 0u64;

                for (is_push, byte) in ops {
                    if is_push {
                        if model.len() < capacity {
                            model.push_back(byte);
                        } else {
                            dropped += 1;
                        }
                        queue.push(byte);
                    } else {
                        prop_assert_eq!(queue.pop(), model.pop_front());
                    }
                    prop_assert_eq!(queue.len(), model.len());
                }
                prop_assert_eq!(queue.overflow_count(), dropped);
                Ok(())
            })
            .expect("queue should behave like a bounded FIFO");
    }

    #[test]
    fn concurrent_producer_and_consumer_preserve_order() {
        let queue = std::sync::Arc::new(InboundQueue::with_capacity(16));
        let producer = {
            let queue = std::sync::Arc::clone(&queue);
            std::thread::spawn(move || {
                for byte in 0..=255u8 {
                    while !queue.push(byte) {
                        std::thread::yield_now();
                    }
                }
            })
        };

        let mut received = Vec::with_capacity(256);
        while received.len() < 256 {
            match queue.pop() {
                Some(byte) => received.push(byte),
                None => std::thread::yield_now(),
            }
        }
        producer.join().expect("producer thread panicked");

        let expected: Vec<u8> = (0..=255u8).collect();
        assert_eq!(received, expected);
    }
}

#[cfg(loom)]
mod model {
    use loom::{sync::Arc, thread};

    use crate::inbound::InboundQueue;

    #[test]
    fn producer_and_consumer_never_observe_torn_bytes() {
        loom::model(|| {
            let queue = Arc::new(InboundQueue::with_capacity(2));
            let producer = {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    queue.push_frame(&[1, 2, 3]);
                })
            };

            let mut seen = Vec::new();
            for _ in 0..3 {
                if let Some(byte) = queue.pop() {
                    seen.push(byte);
                }
            }
            producer.join().expect("producer panicked");
            while let Some(byte) = queue.pop() {
                seen.push(byte);
            }

            // Bytes arrive in order; any missing suffix was counted as overflow.
            let lost = usize::try_from(queue.overflow_count()).expect("small count");
            assert_eq!(seen.len() + lost, 3);
            assert!(seen.windows(2).all(|pair| pair[0] < pair[1]));
            assert_eq!(seen.first().copied(), Some(1));
        });
    }
}
