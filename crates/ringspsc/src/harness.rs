//! Producer/consumer throughput harness.
//!
//! Moves the sequence `0..transfers` from a producer thread to a consumer
//! thread, either through a [`Ring`] or through a bounded
//! `std::sync::mpsc::sync_channel` of the same capacity, and reports how long
//! the transfer took. With `verify` on, the consumer checks that every value
//! equals its running count, which is the FIFO law observed end to end.

use crate::trace::{debug, info, warn};
use crate::{
    Config, Consumer, CountersSnapshot, HarnessError, Producer, PublishMode, RetryPolicy, Ring,
};
use core_affinity::CoreId;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

/// What carries values from the producer to the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Transport {
    /// The SPSC ring with a caller-side retry policy.
    #[default]
    Ring,
    /// A blocking bounded channel, as a baseline.
    Channel,
}

/// Configuration for one harness run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HarnessConfig {
    /// Number of values to transfer.
    ///
    /// Default: 10,000,000
    pub transfers: u64,
    /// Buffer size as power of 2, for either transport.
    ///
    /// Default: 10 (1024 slots)
    pub ring_bits: u8,
    /// Default: [`Transport::Ring`]
    pub transport: Transport,
    /// Check every received value against the expected sequence.
    ///
    /// Default: true
    pub verify: bool,
    /// Retry policy for both ring ends. Ignored by the channel transport.
    ///
    /// Default: [`RetryPolicy::Spin`]
    pub retry: RetryPolicy,
    /// Index publication for the ring. Ignored by the channel transport.
    pub publish: PublishMode,
    /// Pin producer and consumer to the first two cores.
    ///
    /// Default: false
    pub pin_threads: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            transfers: 10_000_000,
            ring_bits: Config::default().ring_bits,
            transport: Transport::Ring,
            verify: true,
            retry: RetryPolicy::Spin,
            publish: PublishMode::Store,
            pin_threads: false,
        }
    }
}

impl HarnessConfig {
    /// Sets the number of values to transfer.
    pub fn with_transfers(mut self, transfers: u64) -> Self {
        self.transfers = transfers;
        self
    }

    /// Sets the buffer size exponent.
    pub fn with_ring_bits(mut self, ring_bits: u8) -> Self {
        self.ring_bits = ring_bits;
        self
    }

    /// Sets the transport.
    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    /// Enables or disables sequence verification.
    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the ring's publication strategy.
    pub fn with_publish(mut self, publish: PublishMode) -> Self {
        self.publish = publish;
        self
    }

    /// Enables or disables thread pinning.
    pub fn with_pin_threads(mut self, pin_threads: bool) -> Self {
        self.pin_threads = pin_threads;
        self
    }

    fn ring_config(&self) -> Config {
        Config::new(self.ring_bits).with_publish(self.publish)
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HarnessReport {
    pub transport: Transport,
    pub transfers: u64,
    /// Wall time from before the threads were spawned until both joined.
    pub elapsed: Duration,
    /// Ring counters after the run; `None` for the channel transport.
    pub counters: Option<CountersSnapshot>,
}

impl HarnessReport {
    /// Transfers per second over the measured interval.
    pub fn ops_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.transfers as f64 / secs
    }
}

/// Runs one transfer as described by `config`.
pub fn run(config: &HarnessConfig) -> Result<HarnessReport, HarnessError> {
    let ring_config = config.ring_config();
    ring_config.validate()?;

    info!(
        transport = ?config.transport,
        transfers = config.transfers,
        ring_bits = config.ring_bits,
        retry = ?config.retry,
        publish = ?config.publish,
        "starting harness run"
    );

    let cores = select_cores(config.pin_threads);
    let report = match config.transport {
        Transport::Ring => run_ring(config, ring_config, cores)?,
        Transport::Channel => run_channel(config, ring_config, cores)?,
    };

    info!(
        elapsed_ms = report.elapsed.as_millis() as u64,
        ops_per_sec = report.ops_per_sec(),
        "harness run complete"
    );
    debug!(counters = ?report.counters, "ring counters");

    Ok(report)
}

fn run_ring(
    config: &HarnessConfig,
    ring_config: Config,
    (producer_core, consumer_core): (Option<CoreId>, Option<CoreId>),
) -> Result<HarnessReport, HarnessError> {
    let (producer, consumer) = Ring::<u64>::new(ring_config)?.split();
    let transfers = config.transfers;
    let retry = config.retry;
    let check = SequenceCheck::new(config.verify);

    let start = Instant::now();

    let producer_thread = thread::Builder::new()
        .name("ring-producer".into())
        .spawn(move || {
            pin_current(producer_core);
            produce_ring(producer, transfers, retry)
        })?;

    // A failed spawn drops the closure and with it the consumer, which lets
    // the producer return.
    let consumer_thread = match thread::Builder::new()
        .name("ring-consumer".into())
        .spawn(move || {
            pin_current(consumer_core);
            consume_ring(consumer, transfers, retry, check)
        }) {
        Ok(handle) => handle,
        Err(err) => {
            let _ = producer_thread.join();
            return Err(err.into());
        }
    };

    // Consumer first: if it dies, the producer sees the ring abandoned.
    let consumed = consumer_thread.join();
    let produced = producer_thread.join();
    let elapsed = start.elapsed();

    let check = consumed.map_err(|_| HarnessError::WorkerPanicked("consumer"))??;
    let producer = produced.map_err(|_| HarnessError::WorkerPanicked("producer"))?;
    check.finish()?;

    Ok(HarnessReport {
        transport: Transport::Ring,
        transfers,
        elapsed,
        counters: Some(producer.counters()),
    })
}

/// Puts `0..transfers`, stopping early if the consumer goes away.
fn produce_ring(
    mut producer: Producer<u64>,
    transfers: u64,
    retry: RetryPolicy,
) -> Producer<u64> {
    for value in 0..transfers {
        let mut item = value;
        while let Err(rejected) = producer.put_with(item, retry) {
            if producer.is_abandoned() {
                debug!(sent = value, "consumer gone, producer stopping");
                return producer;
            }
            // Bounded policy gave up; let the consumer run.
            item = rejected;
            thread::yield_now();
        }
    }
    producer
}

/// Gets `transfers` values into `check`, failing if the producer goes away
/// before sending them all.
fn consume_ring(
    mut consumer: Consumer<u64>,
    transfers: u64,
    retry: RetryPolicy,
    mut check: SequenceCheck,
) -> Result<SequenceCheck, HarnessError> {
    for received in 0..transfers {
        let value = loop {
            if let Some(value) = consumer.get_with(retry) {
                break value;
            }
            if consumer.is_abandoned() && consumer.is_empty() {
                return Err(HarnessError::Disconnected {
                    received,
                    expected: transfers,
                });
            }
            thread::yield_now();
        };
        check.observe(value);
    }
    debug_assert!(consumer.is_empty());
    Ok(check)
}

fn run_channel(
    config: &HarnessConfig,
    ring_config: Config,
    (producer_core, consumer_core): (Option<CoreId>, Option<CoreId>),
) -> Result<HarnessReport, HarnessError> {
    let (tx, rx) = mpsc::sync_channel::<u64>(ring_config.capacity());
    let transfers = config.transfers;
    let check = SequenceCheck::new(config.verify);

    let start = Instant::now();

    let producer_thread = thread::Builder::new()
        .name("chan-producer".into())
        .spawn(move || {
            pin_current(producer_core);
            for value in 0..transfers {
                // The receiver only hangs up early on its own failure, which
                // it reports itself.
                if tx.send(value).is_err() {
                    break;
                }
            }
        })?;

    let consumer_thread = match thread::Builder::new()
        .name("chan-consumer".into())
        .spawn(move || {
            pin_current(consumer_core);
            consume_channel(&rx, transfers, check)
        }) {
        Ok(handle) => handle,
        Err(err) => {
            let _ = producer_thread.join();
            return Err(err.into());
        }
    };

    let consumed = consumer_thread.join();
    let produced = producer_thread.join();
    let elapsed = start.elapsed();

    let check = consumed.map_err(|_| HarnessError::WorkerPanicked("consumer"))??;
    produced.map_err(|_| HarnessError::WorkerPanicked("producer"))?;
    check.finish()?;

    Ok(HarnessReport {
        transport: Transport::Channel,
        transfers,
        elapsed,
        counters: None,
    })
}

fn consume_channel(
    rx: &mpsc::Receiver<u64>,
    transfers: u64,
    mut check: SequenceCheck,
) -> Result<SequenceCheck, HarnessError> {
    for received in 0..transfers {
        match rx.recv() {
            Ok(value) => check.observe(value),
            Err(mpsc::RecvError) => {
                return Err(HarnessError::Disconnected {
                    received,
                    expected: transfers,
                })
            }
        }
    }
    Ok(check)
}

/// Consumer-side FIFO check.
///
/// After the first violation it stops checking but keeps counting, so the
/// consumer still drains every transfer and the producer can finish.
#[derive(Debug)]
struct SequenceCheck {
    verify: bool,
    expected: u64,
    violation: Option<(u64, u64)>,
}

impl SequenceCheck {
    fn new(verify: bool) -> Self {
        Self {
            verify,
            expected: 0,
            violation: None,
        }
    }

    #[inline]
    fn observe(&mut self, value: u64) {
        if self.verify && self.violation.is_none() && value != self.expected {
            warn!(
                expected = self.expected,
                observed = value,
                "consumer observed value out of sequence"
            );
            self.violation = Some((self.expected, value));
        }
        self.expected += 1;
    }

    fn finish(self) -> Result<u64, HarnessError> {
        match self.violation {
            Some((expected, observed)) => Err(HarnessError::SequenceViolation { expected, observed }),
            None => Ok(self.expected),
        }
    }
}

fn select_cores(pin: bool) -> (Option<CoreId>, Option<CoreId>) {
    if !pin {
        return (None, None);
    }
    match core_affinity::get_core_ids() {
        Some(ids) if ids.len() >= 2 => (Some(ids[0]), Some(ids[1])),
        _ => {
            warn!("fewer than two cores visible, running unpinned");
            (None, None)
        }
    }
}

fn pin_current(core: Option<CoreId>) {
    if let Some(core) = core {
        if !core_affinity::set_for_current(core) {
            warn!(core = core.id, "failed to pin worker thread");
        }
    }
}
