//! Contention counters.
//!
//! Diagnostic only: every update is `Relaxed` and nothing in the FIFO
//! protocol reads them. Producer-side and consumer-side counters sit on
//! separate cache lines so that instrumentation does not add false sharing
//! between the two threads.

use crate::sync::{AtomicU64, Ordering};
use crossbeam_utils::CachePadded;

#[derive(Debug)]
struct ProducerCounters {
    put_spins: AtomicU64,
    puts_full: AtomicU64,
}

#[derive(Debug)]
struct ConsumerCounters {
    get_spins: AtomicU64,
    gets_empty: AtomicU64,
}

#[derive(Debug)]
struct SwapCounters {
    succeeded: AtomicU64,
    failed: AtomicU64,
}

/// Thread-safe counters owned by a [`Ring`](crate::Ring).
#[derive(Debug)]
pub(crate) struct Counters {
    producer: CachePadded<ProducerCounters>,
    consumer: CachePadded<ConsumerCounters>,
    swaps: CachePadded<SwapCounters>,
}

impl Counters {
    pub(crate) fn new() -> Self {
        Self {
            producer: CachePadded::new(ProducerCounters {
                put_spins: AtomicU64::new(0),
                puts_full: AtomicU64::new(0),
            }),
            consumer: CachePadded::new(ConsumerCounters {
                get_spins: AtomicU64::new(0),
                gets_empty: AtomicU64::new(0),
            }),
            swaps: CachePadded::new(SwapCounters {
                succeeded: AtomicU64::new(0),
                failed: AtomicU64::new(0),
            }),
        }
    }

    #[inline]
    pub(crate) fn record_put_full(&self) {
        self.producer.puts_full.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_get_empty(&self) {
        self.consumer.gets_empty.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_put_spins(&self, n: u64) {
        if n > 0 {
            self.producer.put_spins.fetch_add(n, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn add_get_spins(&self, n: u64) {
        if n > 0 {
            self.consumer.get_spins.fetch_add(n, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn record_swap(&self, succeeded: bool) {
        let counter = if succeeded {
            &self.swaps.succeeded
        } else {
            &self.swaps.failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            put_spins: self.producer.put_spins.load(Ordering::Relaxed),
            get_spins: self.consumer.get_spins.load(Ordering::Relaxed),
            puts_full: self.producer.puts_full.load(Ordering::Relaxed),
            gets_empty: self.consumer.gets_empty.load(Ordering::Relaxed),
            swaps_succeeded: self.swaps.succeeded.load(Ordering::Relaxed),
            swaps_failed: self.swaps.failed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of a ring's counters.
///
/// Values read while both threads are running are individually accurate but
/// not mutually consistent; take the snapshot after the transfer completes
/// for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CountersSnapshot {
    /// Retries issued by a retry policy after a failed put.
    pub put_spins: u64,
    /// Retries issued by a retry policy after a failed get.
    pub get_spins: u64,
    /// Puts that found the ring full.
    pub puts_full: u64,
    /// Gets that found the ring empty.
    pub gets_empty: u64,
    /// Index publications that won their compare-exchange.
    pub swaps_succeeded: u64,
    /// Index publications that lost their compare-exchange.
    pub swaps_failed: u64,
}
