//! Error types for ring construction and harness runs.

use std::io;
use thiserror::Error;

/// Errors raised while building a ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RingError {
    /// The size exponent is zero or too large for the index width.
    #[error("ring_bits {bits} out of range (expected 1..={max})")]
    InvalidRingBits {
        /// The rejected exponent.
        bits: u8,
        /// The largest accepted exponent on this target.
        max: u8,
    },
}

/// Errors that end a harness run.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The ring could not be built from the harness configuration.
    #[error("invalid ring configuration: {0}")]
    Ring(#[from] RingError),

    /// The consumer observed a value out of FIFO order.
    #[error("sequence violation: expected {expected}, observed {observed}")]
    SequenceViolation {
        /// The value the consumer's counter expected.
        expected: u64,
        /// The value actually received.
        observed: u64,
    },

    /// The channel closed before every transfer was received.
    #[error("channel disconnected after {received} of {expected} transfers")]
    Disconnected {
        /// Transfers received before the disconnect.
        received: u64,
        /// Transfers the run was configured for.
        expected: u64,
    },

    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] io::Error),

    /// A worker thread panicked.
    #[error("{0} thread panicked")]
    WorkerPanicked(&'static str),
}

impl HarnessError {
    /// Returns `true` if the run detected a FIFO violation.
    #[inline]
    pub fn is_sequence_violation(&self) -> bool {
        matches!(self, Self::SequenceViolation { .. })
    }
}
