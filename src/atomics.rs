use std::fmt;
use std::sync::atomic::{AtomicPtr, AtomicU32, Ordering};

///
/// Portable atomics substrate for the lock algorithms.
///
/// Every lock in this crate is written against the operations defined here
/// and nothing else. The orderings are fixed per operation: plain `load` and
/// `store` are relaxed, the `_acquire`/`_release` variants pair up across a
/// lock hand-off, and every read-modify-write is acquire-release. The
/// compare-exchange is the strong variant; spurious failures never surface
/// to the lock state machines.
#[derive(Debug)]
pub struct Atomic32 {
    inner: AtomicU32,
}

impl Atomic32 {
    pub const fn new(value: u32) -> Self {
        Self {
            inner: AtomicU32::new(value),
        }
    }

    /// Plain load, no ordering.
    #[inline]
    pub fn load(&self) -> u32 {
        self.inner.load(Ordering::Relaxed)
    }

    /// Plain store, no ordering.
    #[inline]
    pub fn store(&self, value: u32) {
        self.inner.store(value, Ordering::Relaxed)
    }

    /// Load that observes every write published before the matching
    /// [`store_release`](Self::store_release).
    #[inline]
    pub fn load_acquire(&self) -> u32 {
        self.inner.load(Ordering::Acquire)
    }

    /// Store that publishes every prior write to the next acquiring load.
    #[inline]
    pub fn store_release(&self, value: u32) {
        self.inner.store(value, Ordering::Release)
    }

    /// Atomic exchange, returns the old value.
    #[inline]
    pub fn xchg(&self, value: u32) -> u32 {
        self.inner.swap(value, Ordering::AcqRel)
    }

    /// Strong compare-and-swap, returns the old value regardless of outcome.
    #[inline]
    pub fn cmpxchg(&self, expected: u32, desired: u32) -> u32 {
        match self
            .inner
            .compare_exchange(expected, desired, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(old) => old,
            Err(old) => old,
        }
    }

    /// Strong compare-and-swap with a success flag.
    #[inline]
    pub fn cmpxchg_bool(&self, expected: u32, desired: u32) -> bool {
        self.inner
            .compare_exchange(expected, desired, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Wrapping fetch-and-add, returns the old value.
    #[inline]
    pub fn fetch_add(&self, value: u32) -> u32 {
        self.inner.fetch_add(value, Ordering::AcqRel)
    }

    /// Wrapping fetch-and-sub, returns the old value.
    #[inline]
    pub fn fetch_sub(&self, value: u32) -> u32 {
        self.inner.fetch_sub(value, Ordering::AcqRel)
    }

    /// Fetch-and-and, returns the old value.
    #[inline]
    pub fn fetch_and(&self, value: u32) -> u32 {
        self.inner.fetch_and(value, Ordering::AcqRel)
    }

    /// Fetch-and-or, returns the old value.
    #[inline]
    pub fn fetch_or(&self, value: u32) -> u32 {
        self.inner.fetch_or(value, Ordering::AcqRel)
    }

    /// Wrapping add, returns the new value.
    #[inline]
    pub fn add(&self, value: u32) -> u32 {
        self.fetch_add(value).wrapping_add(value)
    }

    /// Wrapping sub, returns the new value.
    #[inline]
    pub fn sub(&self, value: u32) -> u32 {
        self.fetch_sub(value).wrapping_sub(value)
    }

    /// Wrapping increment, returns the new value.
    #[inline]
    pub fn inc(&self) -> u32 {
        self.add(1)
    }

    /// Wrapping decrement, returns the new value.
    #[inline]
    pub fn dec(&self) -> u32 {
        self.sub(1)
    }
}

///
/// Pointer-width atomic word.
///
/// The queue locks publish node addresses through their `tail` and `next`
/// words. These must be full machine words; funnelling them through a 32-bit
/// operation truncates addresses on 64-bit targets, so the queue locks are
/// written against this type exclusively.
pub struct AtomicWord<T> {
    inner: AtomicPtr<T>,
}

impl<T> AtomicWord<T> {
    pub const fn new(ptr: *mut T) -> Self {
        Self {
            inner: AtomicPtr::new(ptr),
        }
    }

    /// Plain load, no ordering.
    #[inline]
    pub fn load(&self) -> *mut T {
        self.inner.load(Ordering::Relaxed)
    }

    /// Plain store, no ordering.
    #[inline]
    pub fn store(&self, ptr: *mut T) {
        self.inner.store(ptr, Ordering::Relaxed)
    }

    /// Acquire load, pairs with [`store_release`](Self::store_release).
    #[inline]
    pub fn load_acquire(&self) -> *mut T {
        self.inner.load(Ordering::Acquire)
    }

    /// Release store, pairs with [`load_acquire`](Self::load_acquire).
    #[inline]
    pub fn store_release(&self, ptr: *mut T) {
        self.inner.store(ptr, Ordering::Release)
    }

    /// Atomic exchange, returns the old pointer.
    #[inline]
    pub fn xchg(&self, ptr: *mut T) -> *mut T {
        self.inner.swap(ptr, Ordering::AcqRel)
    }

    /// Strong compare-and-swap with a success flag.
    #[inline]
    pub fn cmpxchg_bool(&self, expected: *mut T, desired: *mut T) -> bool {
        self.inner
            .compare_exchange(expected, desired, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl<T> fmt::Debug for AtomicWord<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AtomicWord").field(&self.load()).finish()
    }
}

/// Spin-loop hint. Yields pipeline resources without giving up the
/// timeslice; every busy-wait loop in the crate runs this between probes.
#[inline]
pub fn pause() {
    std::hint::spin_loop();
}
