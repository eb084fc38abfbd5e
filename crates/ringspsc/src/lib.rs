//! RingSPSC - Lock-Free Single-Producer Single-Consumer Ring Buffer
//!
//! A bounded, power-of-two ring with one writer and one reader, built for
//! measuring how spin contention compares to a blocking channel.
//!
//! # Key Features
//!
//! - Never blocks: `put` and `get` return immediately on full/empty
//! - Acquire/Release publication of two monotonically increasing indices
//! - Contention counters (spins, full/empty rejections, index swaps)
//! - Pluggable caller-side retry policies (spin, backoff, bounded)
//! - A producer/consumer throughput harness with a channel baseline
//!
//! # Example
//!
//! ```
//! use ringspsc_rs::{ring, RetryPolicy};
//! use std::thread;
//!
//! let (mut producer, mut consumer) = ring::<u64>(4).unwrap();
//!
//! let handle = thread::spawn(move || {
//!     for i in 0..1_000 {
//!         producer.put_with(i, RetryPolicy::Spin).unwrap();
//!     }
//! });
//!
//! for expected in 0..1_000 {
//!     assert_eq!(consumer.get_with(RetryPolicy::Spin), Some(expected));
//! }
//! handle.join().unwrap();
//!
//! let counters = consumer.counters();
//! assert_eq!(counters.put_spins, counters.puts_full);
//! ```

mod config;
mod counters;
mod error;
pub mod harness;
mod invariants;
pub mod probe;
mod retry;
mod ring;
mod sync;
mod trace;

pub use config::{Config, PublishMode, HIGH_THROUGHPUT_CONFIG, LOW_LATENCY_CONFIG, MAX_RING_BITS};
pub use counters::CountersSnapshot;
pub use error::{HarnessError, RingError};
pub use harness::{HarnessConfig, HarnessReport, Transport};
pub use retry::RetryPolicy;
pub use ring::{ring, Consumer, Producer, Ring};
pub use trace::init_tracing;
