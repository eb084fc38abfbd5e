use crate::counters::{Counters, CountersSnapshot};
use crate::invariants::{
    debug_assert_advanced_by, debug_assert_bounded_count, debug_assert_initialized_read,
    debug_assert_read_not_past_write,
};
use crate::sync::{Arc, AtomicU64, Ordering, UnsafeCell};
use crate::{Config, PublishMode, RingError};
use crossbeam_utils::CachePadded;
use std::fmt;
use std::mem::{self, MaybeUninit};

// =============================================================================
// MEMORY ORDERING & SYNCHRONIZATION STRATEGY
// =============================================================================
//
// ## Sequence Numbers
//
// `write_index` and `read_index` are unbounded u64 sequence numbers, not
// wrapped slot positions. The slot is computed as `sequence & mask` only when
// accessing the buffer, and `write_index - read_index` (wrapping) is always
// the number of buffered items, so "full" and "empty" never alias.
//
// ## Memory Ordering Protocol
//
// **Producer (put):**
// 1. Load `write_index` with Relaxed (only the producer writes it)
// 2. Check space against the producer's cached `read_index`
// 3. If the cache says full: load `read_index` with Acquire (synchronizes
//    with the consumer's Release, so the slot being reused has been read)
// 4. Write the value into the slot
// 5. Publish `write_index + 1` with Release
//
// **Consumer (get):**
// 1. Load `read_index` with Relaxed (only the consumer writes it)
// 2. Check data against the consumer's cached `write_index`
// 3. If the cache says empty: load `write_index` with Acquire (synchronizes
//    with the producer's Release, so the slot write is visible)
// 4. Read the value out of the slot
// 5. Publish `read_index + 1` with Release
//
// ## Single-Writer Invariants
//
// The ring is only reachable through one `Producer` and one `Consumer`.
// Neither is `Clone`, and `put`/`get` take `&mut self`, so each index has
// exactly one writer and the cached remote indices live in the handles
// without any synchronization.
//
// =============================================================================

/// Bounded SPSC ring buffer.
///
/// Build one with [`Ring::new`] and hand out its two ends with
/// [`Ring::split`], or use [`ring`] to do both at once.
///
/// - Indices on separate cache lines to prevent false sharing
/// - Cached remote index on each side to minimize cross-core traffic
/// - Contention counters, readable at any time through [`Ring::counters`]
pub struct Ring<T> {
    /// Write index (written by producer, read by consumer)
    write_index: CachePadded<AtomicU64>,
    /// Read index (written by consumer, read by producer)
    read_index: CachePadded<AtomicU64>,
    counters: Counters,
    config: Config,
    /// Fixed-size slot storage. Slots in `[read_index, write_index)` are
    /// initialized; all others are uninitialized.
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
}

// SAFETY: Slots are handed from the producer thread to the consumer thread,
// which requires `T: Send`. Concurrent access to a single slot never happens:
// the Acquire/Release protocol on the two indices keeps the producer's write
// region and the consumer's read region disjoint.
unsafe impl<T: Send> Send for Ring<T> {}
unsafe impl<T: Send> Sync for Ring<T> {}

impl<T> Ring<T> {
    /// Creates a ring with `config.capacity()` slots. Both indices and all
    /// counters start at zero.
    pub fn new(config: Config) -> Result<Self, RingError> {
        config.validate()?;

        let slots = (0..config.capacity())
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            write_index: CachePadded::new(AtomicU64::new(0)),
            read_index: CachePadded::new(AtomicU64::new(0)),
            counters: Counters::new(),
            config,
            slots,
        })
    }

    /// Splits the ring into its producer and consumer ends.
    ///
    /// The ring is freed, along with any items still buffered, once both
    /// ends are dropped.
    pub fn split(self) -> (Producer<T>, Consumer<T>) {
        let ring = Arc::new(self);
        let write = ring.write_index.load(Ordering::Relaxed);
        let read = ring.read_index.load(Ordering::Relaxed);
        let producer = Producer {
            ring: Arc::clone(&ring),
            cached_read: read,
        };
        let consumer = Consumer {
            ring,
            cached_write: write,
        };
        (producer, consumer)
    }

    // ---------------------------------------------------------------------
    // CONSTANTS & STATUS
    // ---------------------------------------------------------------------

    /// Returns the ring buffer capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.config.capacity()
    }

    /// Returns the index mask for wrapping.
    #[inline]
    fn mask(&self) -> usize {
        self.config.mask()
    }

    /// Returns the configuration the ring was built with.
    #[inline]
    pub fn config(&self) -> Config {
        self.config
    }

    /// Returns the current number of items in the ring.
    ///
    /// Exact when neither side is running; otherwise a momentary view.
    #[inline]
    pub fn len(&self) -> usize {
        // The consumer saw write_index >= read before releasing read, so the
        // Acquire makes the write index loaded afterwards no smaller. The
        // producer may since have run past read + capacity, hence the clamp.
        let read = self.read_index.load(Ordering::Acquire);
        let write = self.write_index.load(Ordering::Relaxed);
        (write.wrapping_sub(read) as usize).min(self.capacity())
    }

    /// Returns true if the ring is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the ring is full.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    /// Get a snapshot of the contention counters.
    pub fn counters(&self) -> CountersSnapshot {
        self.counters.snapshot()
    }

    #[inline(always)]
    fn slot(&self, seq: u64) -> &UnsafeCell<MaybeUninit<T>> {
        &self.slots[(seq as usize) & self.mask()]
    }

    /// Publishes an index advance from `current` to `next`.
    ///
    /// Returns `false` only if a compare-exchange publication lost, which
    /// cannot happen while the index has a single writer.
    #[inline(always)]
    fn publish(&self, index: &AtomicU64, current: u64, next: u64) -> bool {
        match self.config.publish {
            PublishMode::Store => {
                index.store(next, Ordering::Release);
                true
            }
            PublishMode::CompareExchange => {
                let won = index
                    .compare_exchange(current, next, Ordering::Release, Ordering::Relaxed)
                    .is_ok();
                self.counters.record_swap(won);
                won
            }
        }
    }

    pub(crate) fn raw_counters(&self) -> &Counters {
        &self.counters
    }
}

impl<T> Drop for Ring<T> {
    fn drop(&mut self) {
        // Drop all initialized items in the ring
        let read = self.read_index.load(Ordering::Relaxed);
        let write = self.write_index.load(Ordering::Relaxed);

        let mut pos = read;
        while pos != write {
            // SAFETY: `&mut self` means no handle is alive, and every slot in
            // [read, write) holds an initialized value that nobody consumed.
            self.slot(pos)
                .with_mut(|ptr| unsafe { (*ptr).assume_init_drop() });
            pos = pos.wrapping_add(1);
        }
    }
}

impl<T> fmt::Debug for Ring<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ring")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .field("publish", &self.config.publish)
            .field("counters", &self.counters())
            .finish()
    }
}

/// Creates a ring with `2^ring_bits` slots and returns its two ends.
///
/// ```
/// let (mut tx, mut rx) = ringspsc_rs::ring::<u64>(2).unwrap();
/// assert!(tx.put(7).is_ok());
/// assert_eq!(rx.get(), Some(7));
/// assert_eq!(rx.get(), None);
/// ```
pub fn ring<T>(ring_bits: u8) -> Result<(Producer<T>, Consumer<T>), RingError> {
    Ok(Ring::new(Config::new(ring_bits))?.split())
}

// ---------------------------------------------------------------------
// PRODUCER
// ---------------------------------------------------------------------

/// Write end of a [`Ring`].
pub struct Producer<T> {
    ring: Arc<Ring<T>>,
    /// Last observed read index. Refreshed only when the ring appears full.
    cached_read: u64,
}

impl<T> Producer<T> {
    /// Appends `value` to the ring.
    ///
    /// Returns `Err(value)` if the ring is full; nothing is written and only
    /// the `puts_full` counter changes. Never blocks.
    pub fn put(&mut self, value: T) -> Result<(), T> {
        let ring = &*self.ring;
        let capacity = ring.capacity() as u64;
        let write = ring.write_index.load(Ordering::Relaxed);

        if write.wrapping_sub(self.cached_read) >= capacity {
            self.cached_read = ring.read_index.load(Ordering::Acquire);
            if write.wrapping_sub(self.cached_read) >= capacity {
                ring.counters.record_put_full();
                return Err(value);
            }
        }

        let next = write.wrapping_add(1);
        debug_assert_bounded_count!(next.wrapping_sub(self.cached_read), capacity);
        debug_assert_advanced_by!("write_index", write, next, 1);

        let slot = ring.slot(write);
        // SAFETY: The slot is outside [read, write): the consumer has
        // released it (Acquire on read_index) and will not touch it until
        // write_index is advanced below.
        slot.with_mut(|ptr| unsafe { ptr.write(MaybeUninit::new(value)) });

        if ring.publish(&ring.write_index, write, next) {
            Ok(())
        } else {
            // SAFETY: write_index was not advanced, so the consumer never saw
            // this slot; take the value back out.
            Err(slot.with(|ptr| unsafe { (*ptr).assume_init_read() }))
        }
    }

    /// Returns the ring buffer capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Returns the current number of items in the ring.
    #[inline]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns true if the ring is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Returns true if the ring is full.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    /// Get a snapshot of the ring's contention counters.
    pub fn counters(&self) -> CountersSnapshot {
        self.ring.counters()
    }

    /// Returns true once the [`Consumer`] has been dropped.
    ///
    /// Nothing put after this point will ever be read.
    #[inline]
    pub fn is_abandoned(&self) -> bool {
        Arc::strong_count(&self.ring) == 1
    }

    pub(crate) fn ring(&self) -> &Ring<T> {
        &self.ring
    }
}

impl<T> fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("ring", &self.ring)
            .field("cached_read", &self.cached_read)
            .finish()
    }
}

// ---------------------------------------------------------------------
// CONSUMER
// ---------------------------------------------------------------------

/// Read end of a [`Ring`].
pub struct Consumer<T> {
    ring: Arc<Ring<T>>,
    /// Last observed write index. Refreshed only when the ring appears empty.
    cached_write: u64,
}

impl<T> Consumer<T> {
    /// Removes the oldest value from the ring.
    ///
    /// Returns `None` if the ring is empty; only the `gets_empty` counter
    /// changes. Never blocks.
    pub fn get(&mut self) -> Option<T> {
        let ring = &*self.ring;
        let read = ring.read_index.load(Ordering::Relaxed);

        if read == self.cached_write {
            self.cached_write = ring.write_index.load(Ordering::Acquire);
            if read == self.cached_write {
                ring.counters.record_get_empty();
                return None;
            }
        }

        let next = read.wrapping_add(1);
        debug_assert_read_not_past_write!(next, self.cached_write);
        debug_assert_advanced_by!("read_index", read, next, 1);

        let slot = ring.slot(read);
        // SAFETY: read is in [read, write): the producer published this slot
        // with Release and our Acquire load of write_index synchronized with
        // it. The producer will not reuse the slot until read_index advances.
        let value = slot.with(|ptr| unsafe { (*ptr).assume_init_read() });

        if ring.publish(&ring.read_index, read, next) {
            Some(value)
        } else {
            // The slot still owns the value.
            mem::forget(value);
            None
        }
    }

    /// Consumes every available item with a single index publication,
    /// transferring ownership to `handler`. Returns the number consumed.
    pub fn drain<F>(&mut self, handler: F) -> usize
    where
        F: FnMut(T),
    {
        self.drain_up_to(usize::MAX, handler)
    }

    /// Consumes up to `max_items` with a single index publication.
    ///
    /// Useful when large batches would hold the consumer too long. An empty
    /// ring counts once in `gets_empty`.
    pub fn drain_up_to<F>(&mut self, max_items: usize, mut handler: F) -> usize
    where
        F: FnMut(T),
    {
        if max_items == 0 {
            return 0;
        }

        let ring = &*self.ring;
        let read = ring.read_index.load(Ordering::Relaxed);
        let write = ring.write_index.load(Ordering::Acquire);
        self.cached_write = write;

        let avail = write.wrapping_sub(read);
        if avail == 0 {
            ring.counters.record_get_empty();
            return 0;
        }

        let to_consume = avail.min(max_items as u64);
        // Publishes whatever was handed out, even if `handler` panics.
        let mut guard = DrainGuard {
            ring,
            start: read,
            pos: read,
        };

        while guard.pos.wrapping_sub(read) < to_consume {
            let pos = guard.pos;
            debug_assert_initialized_read!(pos, read, write);
            // SAFETY: pos is in [read, write), published by the producer and
            // synchronized by the Acquire load above. Advancing `guard.pos`
            // before calling the handler keeps the slot from being read twice.
            let item = ring
                .slot(pos)
                .with(|ptr| unsafe { (*ptr).assume_init_read() });
            guard.pos = pos.wrapping_add(1);
            handler(item);
        }

        to_consume as usize
    }

    /// Returns the ring buffer capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Returns the current number of items in the ring.
    #[inline]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns true if the ring is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Returns true if the ring is full.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    /// Get a snapshot of the ring's contention counters.
    pub fn counters(&self) -> CountersSnapshot {
        self.ring.counters()
    }

    /// Returns true once the [`Producer`] has been dropped.
    ///
    /// Values it published before dropping are still readable; check this
    /// only after `get` has come back empty.
    #[inline]
    pub fn is_abandoned(&self) -> bool {
        Arc::strong_count(&self.ring) == 1
    }

    pub(crate) fn ring(&self) -> &Ring<T> {
        &self.ring
    }
}

impl<T> fmt::Debug for Consumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("ring", &self.ring)
            .field("cached_write", &self.cached_write)
            .finish()
    }
}

struct DrainGuard<'a, T> {
    ring: &'a Ring<T>,
    start: u64,
    pos: u64,
}

impl<T> Drop for DrainGuard<'_, T> {
    fn drop(&mut self) {
        if self.pos != self.start {
            debug_assert_read_not_past_write!(
                self.pos,
                self.ring.write_index.load(Ordering::Relaxed)
            );
            // A lost compare-exchange is only counted: the items were
            // already handed out.
            self.ring
                .publish(&self.ring.read_index, self.start, self.pos);
        }
    }
}
