use crate::atomics::{pause, Atomic32, AtomicWord};
use crate::errors::{LockErrorType, LockResult};
use log::*;
use std::alloc::{handle_alloc_error, Layout};
use std::cell::{Cell, UnsafeCell};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

/// The heap-allocated queue node behind a [`ClhNode`] handle.
#[derive(Debug)]
struct ClhNodeInner {
    locked: Atomic32,
    prev: Cell<*mut ClhNodeInner>,
}

impl ClhNodeInner {
    const fn unlocked() -> Self {
        Self {
            locked: Atomic32::new(0),
            prev: Cell::new(std::ptr::null_mut()),
        }
    }

    /// Allocates an unlocked node, handing the raw allocation to the
    /// caller. The layout matches `Box`, so retired nodes are freed through
    /// `Box::from_raw`.
    fn leaked() -> LockResult<*mut Self> {
        let layout = Layout::new::<Self>();

        unsafe {
            let p = std::alloc::alloc_zeroed(layout) as *mut Self;
            if p.is_null() {
                return Err(LockErrorType::AllocFailed);
            }

            std::ptr::write(p, Self::unlocked());
            Ok(p)
        }
    }
}

///
/// Owning handle over a CLH queue node.
///
/// The CLH protocol hands node ownership down the queue: after a release,
/// the releasing caller's node becomes the spin target of its successor, so
/// the caller walks away owning its predecessor's retired node instead. The
/// handle tracks that exchange; one handle per thread, fed back into every
/// acquisition, is the intended pattern.
#[derive(Debug)]
pub struct ClhNode {
    inner: NonNull<ClhNodeInner>,
}

// SAFETY: Public APIs that mutate node state require ownership or exclusive
// references.
unsafe impl Send for ClhNode {}
unsafe impl Sync for ClhNode {}

impl ClhNode {
    pub fn new() -> Self {
        let ptr = match ClhNodeInner::leaked() {
            Ok(ptr) => ptr,
            Err(_) => handle_alloc_error(Layout::new::<ClhNodeInner>()),
        };
        // SAFETY: `leaked` returned a non-null allocation.
        let inner = unsafe { NonNull::new_unchecked(ptr) };
        Self { inner }
    }
}

impl Default for ClhNode {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ClhNode {
    fn drop(&mut self) {
        // SAFETY: The handle owns the allocation it currently points at;
        // every hand-off swaps in a node whose previous owner gave it up.
        drop(unsafe { Box::from_raw(self.inner.as_ptr()) });
    }
}

///
/// CLH list-based queue lock.
///
/// The tail word always points at the most recently enqueued node; a dummy
/// node allocated at construction seeds the queue so the first arrival has
/// a predecessor to spin on. Arrivals swap their node in and spin on the
/// predecessor's flag, so acquisitions are FIFO in swap order and the
/// release path is a single store with no successor hand-shake.
pub struct ClhLock<T>
where
    T: ?Sized,
{
    tail: AtomicWord<ClhNodeInner>,
    data: UnsafeCell<T>,
}

impl<T> ClhLock<T> {
    /// Creates the lock, seeding the queue with its dummy node. The dummy
    /// is the only allocation any lock path performs; failure here leaves
    /// no usable lock.
    pub fn new(data: T) -> LockResult<Self> {
        let dummy = ClhNodeInner::leaked()?;
        trace!("clh lock seeded with dummy node at {:?}", dummy);

        Ok(Self {
            tail: AtomicWord::new(dummy),
            data: UnsafeCell::new(data),
        })
    }
}

impl<T> ClhLock<T>
where
    T: ?Sized,
{
    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        unsafe { &mut *self.data.get() }
    }

    /// Acquires the lock, consuming `node`. The guard returns the recycled
    /// predecessor node through [`ClhGuard::into_node`].
    pub fn lock(&self, node: ClhNode) -> ClhGuard<'_, T> {
        let inner = node.inner.as_ptr();
        // SAFETY: The handle owns its node and it is not yet enqueued.
        unsafe { (*inner).locked.store(1) };

        let prev = self.tail.xchg(inner);
        // SAFETY: `prev` is non-null: the tail starts at the dummy and every
        // swap installs a live allocation.
        unsafe {
            (*inner).prev.set(prev);
            while (*prev).locked.load_acquire() != 0 {
                pause();
            }
        }

        ClhGuard {
            mutex: self,
            head: node,
        }
    }
}

impl<T> Drop for ClhLock<T>
where
    T: ?Sized,
{
    fn drop(&mut self) {
        let tail = self.tail.load();
        // SAFETY: With no guard alive the tail node's previous owner has
        // relinquished it, leaving the lock as sole owner.
        drop(unsafe { Box::from_raw(tail) });
    }
}

unsafe impl<T: ?Sized + Send> Send for ClhLock<T> {}
unsafe impl<T: ?Sized + Send> Sync for ClhLock<T> {}

pub struct ClhGuard<'a, T: ?Sized> {
    mutex: &'a ClhLock<T>,
    head: ClhNode,
}

impl<'a, T: ?Sized + 'a> ClhGuard<'a, T> {
    /// Releases the lock and returns the handle, now owning the recycled
    /// predecessor node, for the caller's next acquisition.
    #[must_use]
    pub fn into_node(mut self) -> ClhNode {
        // SAFETY: Called at most once; `self` is forgotten right after, so
        // the `Drop` impl cannot release a second time.
        unsafe { self.release() };
        let inner = self.head.inner;
        std::mem::forget(self);
        ClhNode { inner }
    }

    /// Releases the lock and swaps the handle onto the predecessor node.
    ///
    /// # Safety
    ///
    /// Must be called at most once per guard.
    unsafe fn release(&mut self) {
        let inner = self.head.inner.as_ptr();
        let prev = (*inner).prev.get();
        (*inner).locked.store_release(0);
        // The successor (or the lock itself) owns our node now; the
        // predecessor's retired node is ours.
        self.head.inner = NonNull::new_unchecked(prev);
    }
}

impl<'a, T: ?Sized + 'a> Deref for ClhGuard<'a, T> {
    type Target = T;
    #[inline]
    fn deref(&self) -> &T {
        unsafe { &*self.mutex.data.get() }
    }
}

impl<'a, T: ?Sized + 'a> DerefMut for ClhGuard<'a, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<'a, T: ?Sized + 'a> Drop for ClhGuard<'a, T> {
    #[inline]
    fn drop(&mut self) {
        // SAFETY: `into_node` forgets the guard, so a drop releases once.
        unsafe { self.release() }
    }
}

impl<'a, T: fmt::Debug + ?Sized + 'a> fmt::Debug for ClhGuard<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<'a, T: fmt::Display + ?Sized + 'a> fmt::Display for ClhGuard<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (**self).fmt(f)
    }
}
