//! Caller-side retry policies.
//!
//! `put` and `get` never wait. The loops here sit on top of them, so the
//! waiting strategy can change without touching the ring itself. Each retry
//! issued after a failed attempt is added to `put_spins` / `get_spins`.

use crate::{Consumer, Producer};
use std::hint;
use std::thread;

/// How a caller waits between failed attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RetryPolicy {
    /// Retry immediately with a single `spin_loop` hint until the attempt
    /// succeeds or the other end is dropped.
    #[default]
    Spin,
    /// Like `Spin`, but the `k`-th wait spins `2^k` times and waits past the
    /// seventh yield the thread instead.
    Backoff,
    /// Spin at most `max_retries` times after the first failure, then give up.
    Bounded {
        /// Retries allowed after the first failed attempt.
        max_retries: u64,
    },
}

impl RetryPolicy {
    #[inline]
    fn allows(self, retries: u64) -> bool {
        match self {
            Self::Spin | Self::Backoff => true,
            Self::Bounded { max_retries } => retries < max_retries,
        }
    }

    #[inline]
    fn wait(self, backoff: &mut Backoff) {
        match self {
            Self::Spin | Self::Bounded { .. } => hint::spin_loop(),
            Self::Backoff => backoff.snooze(),
        }
    }
}

/// Exponential spin that falls back to yielding.
///
/// Wait `k` spins `2^k` times; past [`Backoff::MAX_SPIN_STEP`] every wait is a
/// `yield_now`.
#[derive(Debug, Default)]
pub(crate) struct Backoff {
    step: u32,
}

impl Backoff {
    const MAX_SPIN_STEP: u32 = 6;

    #[inline]
    pub(crate) fn snooze(&mut self) {
        if self.step > Self::MAX_SPIN_STEP {
            thread::yield_now();
            return;
        }
        for _ in 0..1u32 << self.step {
            hint::spin_loop();
        }
        self.step += 1;
    }
}

impl<T> Producer<T> {
    /// Puts `value`, retrying on a full ring according to `policy`.
    ///
    /// Returns `Err(value)` when a [`RetryPolicy::Bounded`] budget runs out,
    /// or when the ring is full and the consumer has been dropped. Retries
    /// are added to `put_spins`.
    pub fn put_with(&mut self, value: T, policy: RetryPolicy) -> Result<(), T> {
        let mut value = value;
        let mut retries = 0u64;
        let mut backoff = Backoff::default();

        let result = loop {
            match self.put(value) {
                Ok(()) => break Ok(()),
                Err(rejected) => value = rejected,
            }
            if !policy.allows(retries) || self.is_abandoned() {
                break Err(value);
            }
            retries += 1;
            policy.wait(&mut backoff);
        };

        self.ring().raw_counters().add_put_spins(retries);
        result
    }
}

impl<T> Consumer<T> {
    /// Gets the next value, retrying on an empty ring according to `policy`.
    ///
    /// Returns `None` when a [`RetryPolicy::Bounded`] budget runs out, or
    /// when the producer has been dropped and everything it put has been
    /// read. Retries are added to `get_spins`.
    pub fn get_with(&mut self, policy: RetryPolicy) -> Option<T> {
        let mut retries = 0u64;
        let mut backoff = Backoff::default();

        let result = loop {
            // Sampled before the attempt so a value published just before
            // the producer dropped is still picked up.
            let abandoned = self.is_abandoned();
            if let Some(value) = self.get() {
                break Some(value);
            }
            if abandoned || !policy.allows(retries) {
                break None;
            }
            retries += 1;
            policy.wait(&mut backoff);
        };

        self.ring().raw_counters().add_get_spins(retries);
        result
    }
}
