use crate::atomics::{pause, Atomic32};
use crate::ifaces::RwLockIface;
use cuneiform_fields::arch::ArchPadding;
use std::cell::UnsafeCell;
use std::fmt;
use std::{
    marker::PhantomData as marker,
    ops::{Deref, DerefMut},
};

// Read Guard

pub struct RwReadGuard<'a, T: ?Sized>
where
    RwLock<T>: 'a,
{
    lock: &'a RwLock<T>,
    marker: marker<&'a T>,
}

impl<'a, T: ?Sized> Deref for RwReadGuard<'a, T>
where
    RwLock<T>: 'a,
{
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<'a, T: ?Sized> Drop for RwReadGuard<'a, T> {
    fn drop(&mut self) {
        self.lock.release_read();
    }
}

impl<'a, T> fmt::Debug for RwReadGuard<'a, T>
where
    T: fmt::Debug + ?Sized + 'a,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

// Write Guard

pub struct RwWriteGuard<'a, T: ?Sized>
where
    RwLock<T>: 'a,
{
    lock: &'a RwLock<T>,
    marker: marker<&'a mut T>,
}

impl<'a, T: ?Sized> Deref for RwWriteGuard<'a, T>
where
    RwLock<T>: 'a,
{
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<'a, T: ?Sized> DerefMut for RwWriteGuard<'a, T>
where
    RwLock<T>: 'a,
{
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<'a, T: ?Sized> Drop for RwWriteGuard<'a, T> {
    fn drop(&mut self) {
        self.lock.release_write();
    }
}

impl<'a, T> fmt::Debug for RwWriteGuard<'a, T>
where
    T: fmt::Debug + ?Sized + 'a,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

///
/// Writer-preferring reader-writer spin lock.
///
/// Readers count themselves in; a single writer flag excludes them. A
/// reader commits optimistically: it increments the count, then re-checks
/// the writer flag and backs out if a writer slipped into the window
/// between its first check and the increment. Once the writer flag is up no
/// new reader enters, so writers cut ahead of reader arrivals; a steady
/// stream of writers starves readers and that trade-off is accepted.
pub struct RwLock<T>
where
    T: ?Sized,
{
    readers: ArchPadding<Atomic32>,
    writer: ArchPadding<Atomic32>,
    data: UnsafeCell<T>,
}

unsafe impl<T: ?Sized + Send> Send for RwLock<T> {}
unsafe impl<T: ?Sized + Send + Sync> Sync for RwLock<T> {}

impl<T> RwLock<T> {
    pub fn new(data: T) -> Self {
        Self {
            readers: ArchPadding::new(Atomic32::new(0)),
            writer: ArchPadding::new(Atomic32::new(0)),
            data: UnsafeCell::new(data),
        }
    }

    #[inline]
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T> RwLock<T>
where
    T: ?Sized,
{
    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        unsafe { &mut *self.data.get() }
    }

    // Exposed methods

    #[inline]
    pub fn read(&self) -> RwReadGuard<'_, T> {
        self.lock_read();
        RwReadGuard { lock: self, marker }
    }

    #[inline]
    pub fn try_read(&self) -> Option<RwReadGuard<'_, T>> {
        self.try_lock_read()
            .then(|| RwReadGuard { lock: self, marker })
    }

    #[inline]
    pub fn write(&self) -> RwWriteGuard<'_, T> {
        self.lock_write();
        RwWriteGuard { lock: self, marker }
    }

    #[inline]
    pub fn try_write(&self) -> Option<RwWriteGuard<'_, T>> {
        self.try_lock_write()
            .then(|| RwWriteGuard { lock: self, marker })
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.writer.load() != 0 || self.readers.load() != 0
    }
}

unsafe impl<T> RwLockIface for RwLock<T>
where
    T: ?Sized,
{
    fn lock_read(&self) {
        loop {
            if self.writer.load() == 0 {
                let readers = self.readers.load();
                if self.readers.cmpxchg_bool(readers, readers.wrapping_add(1)) {
                    if self.writer.load() == 0 {
                        return;
                    }
                    // A writer raised its flag between the check and the
                    // increment; back out and retry
                    self.readers.dec();
                }
            }
            pause();
        }
    }

    fn try_lock_read(&self) -> bool {
        if self.writer.load() != 0 {
            return false;
        }
        let readers = self.readers.load();
        if self.readers.cmpxchg_bool(readers, readers.wrapping_add(1)) {
            if self.writer.load() == 0 {
                return true;
            }
            self.readers.dec();
        }
        false
    }

    fn release_read(&self) {
        self.readers.dec();
    }

    fn lock_write(&self) {
        // Raise the flag; from here on no new reader enters
        while self.writer.xchg(1) != 0 {
            pause();
        }

        // Drain readers that committed before the flag went up
        while self.readers.load_acquire() != 0 {
            pause();
        }
    }

    fn try_lock_write(&self) -> bool {
        if self.writer.xchg(1) != 0 {
            return false;
        }
        if self.readers.load_acquire() != 0 {
            self.writer.store(0);
            return false;
        }
        true
    }

    fn release_write(&self) {
        self.writer.store_release(0);
    }
}

// Phase guards

pub struct PhaseReadGuard<'a, T: ?Sized>
where
    PhaseRwLock<T>: 'a,
{
    lock: &'a PhaseRwLock<T>,
    marker: marker<&'a T>,
}

impl<'a, T: ?Sized> Deref for PhaseReadGuard<'a, T>
where
    PhaseRwLock<T>: 'a,
{
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<'a, T: ?Sized> Drop for PhaseReadGuard<'a, T> {
    fn drop(&mut self) {
        self.lock.release_read();
    }
}

impl<'a, T> fmt::Debug for PhaseReadGuard<'a, T>
where
    T: fmt::Debug + ?Sized + 'a,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

pub struct PhaseWriteGuard<'a, T: ?Sized>
where
    PhaseRwLock<T>: 'a,
{
    lock: &'a PhaseRwLock<T>,
    marker: marker<&'a mut T>,
}

impl<'a, T: ?Sized> Deref for PhaseWriteGuard<'a, T>
where
    PhaseRwLock<T>: 'a,
{
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<'a, T: ?Sized> DerefMut for PhaseWriteGuard<'a, T>
where
    PhaseRwLock<T>: 'a,
{
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<'a, T: ?Sized> Drop for PhaseWriteGuard<'a, T> {
    fn drop(&mut self) {
        self.lock.release_write();
    }
}

impl<'a, T> fmt::Debug for PhaseWriteGuard<'a, T>
where
    T: fmt::Debug + ?Sized + 'a,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

///
/// Phase-fair reader-writer spin lock.
///
/// A phase word alternates the lock between reader and writer service: a
/// writer arrival closes the reader phase, drains the readers that are
/// already in, and takes its turn; its release reopens the reader phase.
/// With a steady mix neither class waits for more than one phase of the
/// other, which bounds both reader and writer latency where the plain
/// [`RwLock`] starves readers.
pub struct PhaseRwLock<T>
where
    T: ?Sized,
{
    readers: ArchPadding<Atomic32>,
    writers: ArchPadding<Atomic32>,
    writer_active: ArchPadding<Atomic32>,
    read_phase: ArchPadding<Atomic32>,
    data: UnsafeCell<T>,
}

unsafe impl<T: ?Sized + Send> Send for PhaseRwLock<T> {}
unsafe impl<T: ?Sized + Send + Sync> Sync for PhaseRwLock<T> {}

impl<T> PhaseRwLock<T> {
    pub fn new(data: T) -> Self {
        Self {
            readers: ArchPadding::new(Atomic32::new(0)),
            writers: ArchPadding::new(Atomic32::new(0)),
            writer_active: ArchPadding::new(Atomic32::new(0)),
            // Reader phase starts open so an uncontended lock admits reads
            read_phase: ArchPadding::new(Atomic32::new(1)),
            data: UnsafeCell::new(data),
        }
    }

    #[inline]
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T> PhaseRwLock<T>
where
    T: ?Sized,
{
    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        unsafe { &mut *self.data.get() }
    }

    // Exposed methods

    #[inline]
    pub fn read(&self) -> PhaseReadGuard<'_, T> {
        self.lock_read();
        PhaseReadGuard { lock: self, marker }
    }

    #[inline]
    pub fn try_read(&self) -> Option<PhaseReadGuard<'_, T>> {
        self.try_lock_read()
            .then(|| PhaseReadGuard { lock: self, marker })
    }

    #[inline]
    pub fn write(&self) -> PhaseWriteGuard<'_, T> {
        self.lock_write();
        PhaseWriteGuard { lock: self, marker }
    }

    #[inline]
    pub fn try_write(&self) -> Option<PhaseWriteGuard<'_, T>> {
        self.try_lock_write()
            .then(|| PhaseWriteGuard { lock: self, marker })
    }
}

unsafe impl<T> RwLockIface for PhaseRwLock<T>
where
    T: ?Sized,
{
    fn lock_read(&self) {
        loop {
            // Wait out writer turns
            if self.writer_active.load() == 0 && self.read_phase.load() == 1 {
                let readers = self.readers.load();
                if self.readers.cmpxchg_bool(readers, readers.wrapping_add(1)) {
                    if self.writer_active.load() == 0 {
                        return;
                    }
                    self.readers.dec();
                }
            }
            pause();
        }
    }

    fn try_lock_read(&self) -> bool {
        if self.writer_active.load() != 0 || self.read_phase.load() != 1 {
            return false;
        }
        let readers = self.readers.load();
        if self.readers.cmpxchg_bool(readers, readers.wrapping_add(1)) {
            if self.writer_active.load() == 0 {
                return true;
            }
            self.readers.dec();
        }
        false
    }

    fn release_read(&self) {
        self.readers.dec();
    }

    fn lock_write(&self) {
        self.writers.inc();
        self.read_phase.store(0);

        while self.readers.load() != 0 {
            pause();
        }

        while self.writer_active.xchg(1) != 0 {
            pause();
        }

        // A predecessor's release reopened the phase while this writer was
        // still queued on `writer_active`; close it again and re-drain the
        // readers it let in
        self.read_phase.store(0);
        while self.readers.load_acquire() != 0 {
            pause();
        }

        self.writers.dec();
    }

    fn try_lock_write(&self) -> bool {
        if self.writer_active.xchg(1) != 0 {
            return false;
        }
        if self.readers.load_acquire() != 0 {
            self.writer_active.store(0);
            return false;
        }
        true
    }

    fn release_write(&self) {
        self.writer_active.store_release(0);
        self.read_phase.store(1);
    }
}
