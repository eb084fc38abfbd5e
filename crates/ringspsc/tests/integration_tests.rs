#![cfg(not(feature = "loom"))]

use ringspsc_rs::harness::{self, HarnessConfig, Transport};
use ringspsc_rs::{ring, Config, PublishMode, RetryPolicy, Ring};
use std::thread;

#[test]
fn test_round_trip_full_capacity() {
    for ring_bits in 1..=8 {
        let (mut tx, mut rx) = ring::<u64>(ring_bits).unwrap();
        let capacity = tx.capacity() as u64;

        for i in 0..capacity {
            assert!(tx.put(i).is_ok(), "put {} failed with capacity {}", i, capacity);
        }
        assert!(tx.is_full());

        for i in 0..capacity {
            assert_eq!(rx.get(), Some(i));
        }
        assert_eq!(rx.len(), 0);
        assert_eq!(rx.get(), None);
    }
}

#[test]
fn test_wraparound_preserves_order() {
    let (mut tx, mut rx) = ring::<u64>(2).unwrap(); // capacity 4

    let mut out = Vec::new();
    for i in 0..20 {
        assert!(tx.put(i).is_ok());
        out.push(rx.get().unwrap());
    }

    assert_eq!(out, (0..20).collect::<Vec<_>>());
    assert!(rx.is_empty());
    let counters = rx.counters();
    assert_eq!(counters.puts_full, 0);
    assert_eq!(counters.gets_empty, 0);
}

#[test]
fn test_wraparound_with_partial_fill() {
    let (mut tx, mut rx) = ring::<u32>(2).unwrap();
    let mut next_put = 0;
    let mut next_get = 0;

    // Keep the ring between 1 and 3 items so the indices walk past the slot
    // array boundary many times.
    for _ in 0..50 {
        while tx.len() < 3 {
            assert!(tx.put(next_put).is_ok());
            next_put += 1;
        }
        while rx.len() > 1 {
            assert_eq!(rx.get(), Some(next_get));
            next_get += 1;
        }
    }
    while let Some(v) = rx.get() {
        assert_eq!(v, next_get);
        next_get += 1;
    }
    assert_eq!(next_get, next_put);
}

#[test]
fn test_concurrent_fifo_across_capacities() {
    const N: u64 = 100_000;

    for ring_bits in [1u8, 2, 6, 12] {
        let (mut tx, mut rx) = ring::<u64>(ring_bits).unwrap();

        let producer = thread::spawn(move || {
            for i in 0..N {
                let mut item = i;
                while let Err(rejected) = tx.put(item) {
                    item = rejected;
                    std::hint::spin_loop();
                }
            }
            tx
        });

        let consumer = thread::spawn(move || {
            let mut expected = 0u64;
            while expected < N {
                if let Some(v) = rx.get() {
                    assert_eq!(v, expected, "FIFO violation: expected {}, got {}", expected, v);
                    expected += 1;
                }
            }
            rx
        });

        let tx = producer.join().unwrap();
        let rx = consumer.join().unwrap();
        assert!(rx.is_empty());
        // Raw put/get loops never go through a retry policy
        let counters = tx.counters();
        assert_eq!(counters.put_spins, 0);
        assert_eq!(counters.get_spins, 0);
    }
}

#[test]
fn test_len_bounded_during_concurrent_traffic() {
    const N: u64 = 200_000;
    let (mut tx, mut rx) = ring::<u64>(1).unwrap();

    let producer = thread::spawn(move || {
        let mut max_seen = 0;
        for i in 0..N {
            tx.put_with(i, RetryPolicy::Spin).unwrap();
            max_seen = max_seen.max(tx.len());
        }
        max_seen
    });

    let mut max_seen = 0;
    for i in 0..N {
        assert_eq!(rx.get_with(RetryPolicy::Spin), Some(i));
        max_seen = max_seen.max(rx.len());
    }

    assert!(producer.join().unwrap() <= 2);
    assert!(max_seen <= 2);
}

#[test]
fn test_concurrent_zero_transfers() {
    let (tx, rx) = ring::<u64>(1).unwrap();
    let producer = thread::spawn(move || drop(tx));
    let consumer = thread::spawn(move || rx.len());
    producer.join().unwrap();
    assert_eq!(consumer.join().unwrap(), 0);
}

#[test]
fn test_concurrent_drain_with_compare_exchange() {
    const N: u64 = 50_000;

    let config = Config::new(3).with_publish(PublishMode::CompareExchange);
    let (mut tx, mut rx) = Ring::<u64>::new(config).unwrap().split();

    let producer = thread::spawn(move || {
        for i in 0..N {
            tx.put_with(i, RetryPolicy::Backoff).unwrap();
        }
    });

    let mut expected = 0u64;
    while expected < N {
        rx.drain(|v| {
            assert_eq!(v, expected);
            expected += 1;
        });
    }
    producer.join().unwrap();

    let counters = rx.counters();
    assert_eq!(counters.swaps_failed, 0);
    // One swap per put, at least one per non-empty drain
    assert!(counters.swaps_succeeded > N);
}

#[test]
fn test_moves_owned_values() {
    let (mut tx, mut rx) = ring::<String>(2).unwrap();

    let producer = thread::spawn(move || {
        for i in 0..1_000 {
            tx.put_with(format!("msg-{}", i), RetryPolicy::Spin).unwrap();
        }
    });

    for i in 0..1_000 {
        assert_eq!(rx.get_with(RetryPolicy::Spin).unwrap(), format!("msg-{}", i));
    }
    producer.join().unwrap();
}

#[test]
fn test_harness_ring_transport() {
    for retry in [
        RetryPolicy::Spin,
        RetryPolicy::Backoff,
        RetryPolicy::Bounded { max_retries: 4 },
    ] {
        let config = HarnessConfig::default()
            .with_transfers(20_000)
            .with_ring_bits(2)
            .with_retry(retry);
        let report = harness::run(&config).unwrap();

        assert_eq!(report.transport, Transport::Ring);
        assert_eq!(report.transfers, 20_000);
        let counters = report.counters.expect("ring runs report counters");
        assert!(counters.put_spins <= counters.puts_full);
        assert!(counters.get_spins <= counters.gets_empty);
        assert_eq!(counters.swaps_succeeded, 0);
    }
}

#[test]
fn test_harness_ring_compare_exchange_counts_every_publication() {
    let config = HarnessConfig::default()
        .with_transfers(10_000)
        .with_ring_bits(4)
        .with_publish(PublishMode::CompareExchange);
    let counters = harness::run(&config).unwrap().counters.unwrap();

    // One publication per put and one per get
    assert_eq!(counters.swaps_succeeded, 20_000);
    assert_eq!(counters.swaps_failed, 0);
}

#[test]
fn test_harness_channel_transport() {
    let config = HarnessConfig::default()
        .with_transfers(20_000)
        .with_ring_bits(4)
        .with_transport(Transport::Channel);
    let report = harness::run(&config).unwrap();

    assert_eq!(report.transport, Transport::Channel);
    assert!(report.counters.is_none());
}

#[test]
fn test_harness_zero_transfers_and_pinning() {
    let config = HarnessConfig::default()
        .with_transfers(0)
        .with_pin_threads(true)
        .with_verify(false);
    let report = harness::run(&config).unwrap();
    assert_eq!(report.transfers, 0);
    assert_eq!(report.counters, Some(Default::default()));
}
