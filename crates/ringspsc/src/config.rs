use crate::RingError;

/// Largest accepted `ring_bits`. Capacity must fit in `usize` with a spare bit
/// so that `capacity` and `mask` never overflow.
pub const MAX_RING_BITS: u8 = (usize::BITS - 2) as u8;

/// How an index advance is published to the other side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PublishMode {
    /// Plain `Release` store. Sufficient for one producer and one consumer.
    #[default]
    Store,
    /// `Release` compare-exchange against the previously loaded index.
    /// Outcomes are recorded in the swap counters.
    CompareExchange,
}

/// Configuration for a [`Ring`](crate::Ring).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Ring buffer size as power of 2 (default: 10 = 1024 slots)
    pub ring_bits: u8,
    /// Index publication strategy
    pub publish: PublishMode,
}

impl Config {
    /// Creates a configuration with `2^ring_bits` slots and store publication.
    pub const fn new(ring_bits: u8) -> Self {
        Self {
            ring_bits,
            publish: PublishMode::Store,
        }
    }

    /// Sets the publication strategy.
    pub const fn with_publish(mut self, publish: PublishMode) -> Self {
        self.publish = publish;
        self
    }

    /// Returns the capacity of the ring buffer.
    ///
    /// Returns 0 when `1 << ring_bits` does not fit in a `usize`; such a
    /// config never passes [`Config::validate`].
    #[inline]
    pub const fn capacity(&self) -> usize {
        match 1usize.checked_shl(self.ring_bits as u32) {
            Some(capacity) => capacity,
            None => 0,
        }
    }

    /// Returns the mask for index wrapping.
    #[inline]
    pub const fn mask(&self) -> usize {
        self.capacity().wrapping_sub(1)
    }

    /// Checks that `ring_bits` is in `1..=MAX_RING_BITS`.
    pub const fn validate(&self) -> Result<(), RingError> {
        if self.ring_bits == 0 || self.ring_bits > MAX_RING_BITS {
            return Err(RingError::InvalidRingBits {
                bits: self.ring_bits,
                max: MAX_RING_BITS,
            });
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(10)
    }
}

/// Low latency configuration (4K slots, fits in L1 cache)
pub const LOW_LATENCY_CONFIG: Config = Config::new(12);

/// High throughput configuration (256K slots)
pub const HIGH_THROUGHPUT_CONFIG: Config = Config::new(18);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_and_mask() {
        let config = Config::new(4);
        assert_eq!(config.capacity(), 16);
        assert_eq!(config.mask(), 15);
        assert_eq!(Config::default().capacity(), 1024);
    }

    #[test]
    fn test_validate_bounds() {
        assert!(Config::new(1).validate().is_ok());
        assert!(Config::new(MAX_RING_BITS).validate().is_ok());
        assert_eq!(
            Config::new(0).validate(),
            Err(RingError::InvalidRingBits {
                bits: 0,
                max: MAX_RING_BITS
            })
        );
        assert!(Config::new(MAX_RING_BITS + 1).validate().is_err());
    }

    #[test]
    fn test_capacity_out_of_range_does_not_overflow() {
        for bits in [usize::BITS as u8, 100, u8::MAX] {
            let config = Config::new(bits);
            assert_eq!(config.capacity(), 0);
            assert_eq!(config.mask(), usize::MAX);
            assert!(config.validate().is_err());
        }
        assert_eq!(Config::new(usize::BITS as u8 - 1).capacity(), 1 << (usize::BITS - 1));
    }
}
