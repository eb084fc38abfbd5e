use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ringspsc_rs::harness::{self, HarnessConfig, Transport};
use ringspsc_rs::probe;
use ringspsc_rs::{ring, Config, PublishMode, RetryPolicy, Ring};
use std::thread;

const MESSAGES: u64 = 1_000_000; // 1M messages per iteration

fn bench_spsc(c: &mut Criterion) {
    let mut group = c.benchmark_group("spsc");
    group.throughput(Throughput::Elements(MESSAGES));

    for ring_bits in [1u8, 6, 10, 16] {
        group.bench_with_input(
            BenchmarkId::new("spin", 1usize << ring_bits),
            &ring_bits,
            |b, &bits| {
                b.iter(|| {
                    let (mut producer, mut consumer) = ring::<u64>(bits).unwrap();

                    let producer_handle = thread::spawn(move || {
                        for i in 0..MESSAGES {
                            producer.put_with(i, RetryPolicy::Spin).unwrap();
                        }
                    });

                    for _ in 0..MESSAGES {
                        black_box(consumer.get_with(RetryPolicy::Spin));
                    }

                    producer_handle.join().unwrap();
                });
            },
        );
    }

    group.finish();
}

fn bench_publish_modes(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish");
    group.throughput(Throughput::Elements(MESSAGES));

    for (name, publish) in [
        ("store", PublishMode::Store),
        ("compare_exchange", PublishMode::CompareExchange),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| {
                let config = Config::new(10).with_publish(publish);
                let (mut producer, mut consumer) = Ring::<u64>::new(config).unwrap().split();

                let producer_handle = thread::spawn(move || {
                    for i in 0..MESSAGES {
                        producer.put_with(i, RetryPolicy::Spin).unwrap();
                    }
                });

                // Batch consumption: one index publication per drain
                let mut count = 0u64;
                while count < MESSAGES {
                    count += consumer.drain(|item| {
                        black_box(item);
                    }) as u64;
                    if count < MESSAGES {
                        std::hint::spin_loop();
                    }
                }

                producer_handle.join().unwrap();
            });
        });
    }

    group.finish();
}

fn bench_ring_vs_channel(c: &mut Criterion) {
    let mut group = c.benchmark_group("transport");
    group.throughput(Throughput::Elements(MESSAGES));
    group.sample_size(20);

    for transport in [Transport::Ring, Transport::Channel] {
        group.bench_function(format!("{:?}", transport).to_lowercase(), |b| {
            let config = HarnessConfig::default()
                .with_transfers(MESSAGES)
                .with_transport(transport);
            b.iter(|| black_box(harness::run(&config).unwrap()));
        });
    }

    group.finish();
}

fn bench_loads(c: &mut Criterion) {
    const LOADS: u64 = 1_000_000;

    let mut group = c.benchmark_group("loads");
    group.throughput(Throughput::Elements(LOADS));
    group.bench_function("plain", |b| b.iter(|| probe::plain_loads(black_box(LOADS))));
    group.bench_function("atomic", |b| b.iter(|| probe::atomic_loads(black_box(LOADS))));
    group.finish();
}

criterion_group!(
    benches,
    bench_spsc,
    bench_publish_modes,
    bench_ring_vs_channel,
    bench_loads
);
criterion_main!(benches);
