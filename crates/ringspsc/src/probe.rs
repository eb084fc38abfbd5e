//! Memory load rate probe.
//!
//! Baseline for the harness numbers: how many plain and atomic 64-bit loads
//! of a single shared word one thread can issue per second.

use std::hint::black_box;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

static WORD: AtomicU64 = AtomicU64::new(3);

/// Which kind of load a probe issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LoadKind {
    /// Non-atomic reads through a plain reference.
    Plain,
    /// `Relaxed` atomic loads.
    Atomic,
}

/// Result of one probe run.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProbeReport {
    pub kind: LoadKind,
    /// Loads issued (`n` rounded down to a multiple of ten).
    pub loads: u64,
    /// Sum of every loaded value; keeps the loop from being optimized out.
    pub total: u64,
    pub elapsed: Duration,
}

impl ProbeReport {
    /// Loads per second over the measured interval.
    pub fn loads_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.loads as f64 / secs
    }
}

/// Sums `n / 10 * 10` plain loads of a shared word.
///
/// Every term reads through a pointer laundered by `black_box`, so the load
/// cannot be hoisted out of the loop or folded into a multiply.
pub fn plain_loads(n: u64) -> u64 {
    let word = WORD.load(Ordering::Relaxed);
    let p: &u64 = &word;
    let mut total = 0u64;
    for _ in 0..n / 10 {
        total = total.wrapping_add(*black_box(p));
        total = total.wrapping_add(*black_box(p));
        total = total.wrapping_add(*black_box(p));
        total = total.wrapping_add(*black_box(p));
        total = total.wrapping_add(*black_box(p));
        total = total.wrapping_add(*black_box(p));
        total = total.wrapping_add(*black_box(p));
        total = total.wrapping_add(*black_box(p));
        total = total.wrapping_add(*black_box(p));
        total = total.wrapping_add(*black_box(p));
    }
    total
}

/// Sums `n / 10 * 10` `Relaxed` atomic loads of a shared word.
pub fn atomic_loads(n: u64) -> u64 {
    let p = black_box(&WORD);
    let mut total = 0u64;
    for _ in 0..n / 10 {
        total = total.wrapping_add(p.load(Ordering::Relaxed));
        total = total.wrapping_add(p.load(Ordering::Relaxed));
        total = total.wrapping_add(p.load(Ordering::Relaxed));
        total = total.wrapping_add(p.load(Ordering::Relaxed));
        total = total.wrapping_add(p.load(Ordering::Relaxed));
        total = total.wrapping_add(p.load(Ordering::Relaxed));
        total = total.wrapping_add(p.load(Ordering::Relaxed));
        total = total.wrapping_add(p.load(Ordering::Relaxed));
        total = total.wrapping_add(p.load(Ordering::Relaxed));
        total = total.wrapping_add(p.load(Ordering::Relaxed));
    }
    total
}

/// Times `n` loads of the given kind.
pub fn measure(kind: LoadKind, n: u64) -> ProbeReport {
    let start = Instant::now();
    let total = match kind {
        LoadKind::Plain => plain_loads(black_box(n)),
        LoadKind::Atomic => atomic_loads(black_box(n)),
    };
    let elapsed = start.elapsed();

    ProbeReport {
        kind,
        loads: n / 10 * 10,
        total: black_box(total),
        elapsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loads_sum_the_shared_word() {
        assert_eq!(plain_loads(100), 300);
        assert_eq!(atomic_loads(100), 300);
        // Remainder below the unroll factor is dropped
        assert_eq!(plain_loads(19), 30);
        assert_eq!(atomic_loads(9), 0);
    }

    #[test]
    fn test_measure_reports_rounded_load_count() {
        let report = measure(LoadKind::Atomic, 1_005);
        assert_eq!(report.kind, LoadKind::Atomic);
        assert_eq!(report.loads, 1_000);
        assert_eq!(report.total, 3_000);
        assert!(report.loads_per_sec() >= 0.0);
    }

    #[test]
    fn test_plain_loads_are_not_folded() {
        // Folded to a multiply, 50M loads would finish in well under a
        // microsecond. Real loads cannot beat ~10 per nanosecond.
        const LOADS: u64 = 50_000_000;

        let report = measure(LoadKind::Plain, LOADS);
        assert_eq!(report.total, 3 * LOADS);
        assert!(
            report.elapsed >= Duration::from_micros(500),
            "{LOADS} plain loads took {:?}",
            report.elapsed
        );
    }

    #[test]
    fn test_plain_load_time_grows_with_count() {
        let small = measure(LoadKind::Plain, 1_000);
        let large = measure(LoadKind::Plain, 20_000_000);
        assert!(
            large.elapsed > small.elapsed,
            "small {:?}, large {:?}",
            small.elapsed,
            large.elapsed
        );
    }
}
