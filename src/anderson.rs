use crate::alloc::slot_buckets;
use crate::atomics::{pause, Atomic32};
use crate::errors::{LockErrorType, LockResult};
use cuneiform_fields::arch::ArchPadding;
use log::*;
use std::cell::UnsafeCell;
use std::fmt;
use std::{
    marker::PhantomData as marker,
    ops::{Deref, DerefMut},
};

/// Largest slot array an [`ArrayLock`] will carry.
pub const MAX_SLOTS: usize = 64;

pub struct ArrayGuard<'a, T: ?Sized> {
    mutex: &'a ArrayLock<T>,
    slot: u32,
    marker: marker<&'a mut T>,
}

impl<'a, T: ?Sized + 'a> ArrayGuard<'a, T> {
    /// The slot this acquisition spun on.
    #[inline]
    pub fn slot(&self) -> u32 {
        self.slot
    }
}

impl<'a, T: ?Sized + 'a> Deref for ArrayGuard<'a, T> {
    type Target = T;
    #[inline]
    fn deref(&self) -> &T {
        unsafe { &*self.mutex.data.get() }
    }
}

impl<'a, T: ?Sized + 'a> DerefMut for ArrayGuard<'a, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<'a, T: ?Sized + 'a> Drop for ArrayGuard<'a, T> {
    #[inline]
    fn drop(&mut self) {
        self.mutex.release();
    }
}

impl<'a, T: fmt::Debug + ?Sized + 'a> fmt::Debug for ArrayGuard<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<'a, T: fmt::Display + ?Sized + 'a> fmt::Display for ArrayGuard<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (**self).fmt(f)
    }
}

///
/// Anderson array-based queue lock.
///
/// Arrivals claim a slot from a counter and spin on their own flag word;
/// release hands the flag to the next slot. Acquisitions are FIFO in slot
/// order and each waiter spins on its own cache line, so the hand-off
/// touches one line instead of invalidating every waiter.
///
/// The slot array bounds concurrency: at most `num_slots` callers may be
/// between `lock` and the guard drop at any instant. Running more callers
/// than slots wraps the slot counter onto a line that is still in use and
/// breaks mutual exclusion. Sizing the array to the maximum anticipated
/// concurrency is the caller's contract.
pub struct ArrayLock<T>
where
    T: ?Sized,
{
    next_slot: ArchPadding<Atomic32>,
    serving_slot: ArchPadding<Atomic32>,
    flags: Box<[ArchPadding<Atomic32>]>,
    num_slots: u32,
    data: UnsafeCell<T>,
}

impl<T> ArrayLock<T> {
    /// Creates a lock with the full [`MAX_SLOTS`] slot array.
    #[inline]
    pub fn new(data: T) -> Self {
        Self::with_slots(MAX_SLOTS, data).expect("MAX_SLOTS lies within the slot bound")
    }

    /// Creates a lock with `slots` padded slots, bounding concurrency to
    /// `slots` callers.
    pub fn with_slots(slots: usize, data: T) -> LockResult<Self> {
        if slots == 0 || slots > MAX_SLOTS {
            debug!("rejecting array lock slot count: {}", slots);
            return Err(LockErrorType::SlotBound(MAX_SLOTS));
        }

        // First slot starts available, the rest parked
        let flags = slot_buckets(slots, |i| {
            ArchPadding::new(Atomic32::new(u32::from(i == 0)))
        });

        Ok(Self {
            next_slot: ArchPadding::new(Atomic32::new(0)),
            serving_slot: ArchPadding::new(Atomic32::new(0)),
            flags,
            num_slots: slots as u32,
            data: UnsafeCell::new(data),
        })
    }

    #[inline]
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T> ArrayLock<T>
where
    T: ?Sized,
{
    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        unsafe { &mut *self.data.get() }
    }

    #[inline]
    pub fn num_slots(&self) -> u32 {
        self.num_slots
    }

    #[inline]
    fn acquire(&self) -> u32 {
        let my_slot = self.next_slot.fetch_add(1) % self.num_slots;
        let flag = &self.flags[my_slot as usize];

        while flag.load_acquire() == 0 {
            pause();
        }
        // Park the slot again for the caller that will wrap onto it
        flag.store_release(0);
        my_slot
    }

    #[inline]
    fn release(&self) {
        let next = self.serving_slot.load().wrapping_add(1) % self.num_slots;
        self.serving_slot.store(next);
        self.flags[next as usize].store_release(1);
    }

    #[inline]
    pub fn lock(&self) -> ArrayGuard<'_, T> {
        let slot = self.acquire();
        ArrayGuard {
            mutex: self,
            slot,
            marker,
        }
    }
}

unsafe impl<T: ?Sized + Send> Send for ArrayLock<T> {}
unsafe impl<T: ?Sized + Send> Sync for ArrayLock<T> {}
