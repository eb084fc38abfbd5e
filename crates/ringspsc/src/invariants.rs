//! Debug assertion macros for ring buffer invariants.
//!
//! Only active in debug builds (`debug_assert!`), so release builds pay
//! nothing for them.

// =============================================================================
// Bounded count
// =============================================================================

/// Assert that the number of buffered items does not exceed capacity.
///
/// **Invariant**: `0 ≤ (write_index - read_index) ≤ capacity`
///
/// Used in: `Producer::put()` before publishing the new write index
macro_rules! debug_assert_bounded_count {
    ($count:expr, $capacity:expr) => {
        debug_assert!(
            $count <= $capacity,
            "bounded count violated: {} items exceed capacity {}",
            $count,
            $capacity
        )
    };
}

/// Assert that the read index does not advance past the write index.
///
/// **Invariant**: `read_index ≤ write_index` (after advance, wrapping-aware)
///
/// Used in: `Consumer::get()` and the drain paths before publishing
macro_rules! debug_assert_read_not_past_write {
    ($new_read:expr, $write:expr) => {
        debug_assert!(
            $write.wrapping_sub($new_read) < (1u64 << 63),
            "read index {} advanced beyond write index {}",
            $new_read,
            $write
        )
    };
}

// =============================================================================
// Monotonic progress
// =============================================================================

/// Assert that an index advanced by exactly `n` (wrapping).
///
/// **Invariant**: indices only move forward
///
/// Used in: both publication paths
macro_rules! debug_assert_advanced_by {
    ($name:literal, $old:expr, $new:expr, $n:expr) => {
        debug_assert!(
            $new.wrapping_sub($old) == $n,
            "{} moved from {} to {} (expected +{})",
            $name,
            $old,
            $new,
            $n
        )
    };
}

// =============================================================================
// Initialized range
// =============================================================================

/// Assert that we're reading from an initialized slot.
///
/// **Invariant**: `slot(pos) is initialized ⟺ read_index ≤ pos < write_index`
///
/// Used in: `Consumer::get()` and the drain paths before `assume_init_read()`
macro_rules! debug_assert_initialized_read {
    ($pos:expr, $read:expr, $write:expr) => {
        debug_assert!(
            $pos.wrapping_sub($read) < $write.wrapping_sub($read),
            "reading slot at seq {} outside initialized range [{}, {})",
            $pos,
            $read,
            $write
        )
    };
}

pub(crate) use debug_assert_advanced_by;
pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_initialized_read;
pub(crate) use debug_assert_read_not_past_write;
