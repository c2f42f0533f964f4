use crate::atomics::{pause, Atomic32};
use crate::ifaces::LockIface;
use cuneiform_fields::arch::ArchPadding;
use std::cell::UnsafeCell;
use std::fmt;
use std::{
    marker::PhantomData as marker,
    ops::{Deref, DerefMut},
};

pub struct TicketGuard<'a, T: ?Sized> {
    mutex: &'a TicketLock<T>,
    ticket: u32,
    marker: marker<&'a mut T>,
}

impl<'a, T: ?Sized + 'a> TicketGuard<'a, T> {
    /// The ticket this acquisition was served under. Tickets are issued in
    /// arrival order and served in issue order.
    #[inline]
    pub fn ticket(&self) -> u32 {
        self.ticket
    }
}

impl<'a, T: ?Sized + 'a> Deref for TicketGuard<'a, T> {
    type Target = T;
    #[inline]
    fn deref(&self) -> &T {
        unsafe { &*self.mutex.data.get() }
    }
}

impl<'a, T: ?Sized + 'a> DerefMut for TicketGuard<'a, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<'a, T: ?Sized + 'a> Drop for TicketGuard<'a, T> {
    #[inline]
    fn drop(&mut self) {
        self.mutex.unlock();
    }
}

impl<'a, T: fmt::Debug + ?Sized + 'a> fmt::Debug for TicketGuard<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<'a, T: fmt::Display + ?Sized + 'a> fmt::Display for TicketGuard<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (**self).fmt(f)
    }
}

///
/// FIFO ticket lock.
///
/// Arrivals take a ticket from `next_ticket` and wait until `serving`
/// reaches it, so acquisitions complete in strict arrival order and no
/// waiter starves under a fair scheduler. Both counters wrap modulo 2³².
/// The counters sit on separate cache lines; waiters all spin on `serving`,
/// which only the current holder writes.
pub struct TicketLock<T>
where
    T: ?Sized,
{
    next_ticket: ArchPadding<Atomic32>,
    serving: ArchPadding<Atomic32>,
    data: UnsafeCell<T>,
}

impl<T> TicketLock<T> {
    #[inline]
    pub fn new(data: T) -> Self {
        Self {
            next_ticket: ArchPadding::new(Atomic32::new(0)),
            serving: ArchPadding::new(Atomic32::new(0)),
            data: UnsafeCell::new(data),
        }
    }

    #[inline]
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T> TicketLock<T>
where
    T: ?Sized,
{
    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        unsafe { &mut *self.data.get() }
    }

    /// Number of callers currently holding or awaiting the lock.
    #[inline]
    pub fn waiters(&self) -> u32 {
        self.next_ticket.load().wrapping_sub(self.serving.load())
    }

    #[inline]
    fn acquire(&self) -> u32 {
        let my_ticket = self.next_ticket.fetch_add(1);

        while self.serving.load_acquire() != my_ticket {
            pause();
        }
        my_ticket
    }

    #[inline]
    fn try_acquire(&self) -> Option<u32> {
        let next_ticket = self.next_ticket.load();
        let serving = self.serving.load();

        // Lock is already contended
        if next_ticket != serving {
            return None;
        }

        // Claim the ticket, then verify it is the one being served
        let claimed = self
            .next_ticket
            .cmpxchg_bool(next_ticket, next_ticket.wrapping_add(1))
            && self.serving.load_acquire() == next_ticket;
        claimed.then_some(next_ticket)
    }

    #[inline]
    pub fn lock(&self) -> TicketGuard<'_, T> {
        let ticket = self.acquire();
        TicketGuard {
            mutex: self,
            ticket,
            marker,
        }
    }

    #[inline]
    pub fn try_lock(&self) -> Option<TicketGuard<'_, T>> {
        self.try_acquire().map(|ticket| TicketGuard {
            mutex: self,
            ticket,
            marker,
        })
    }

    #[inline]
    pub unsafe fn force_unlock(&self) {
        <Self as LockIface>::unlock(self);
    }
}

unsafe impl<T: ?Sized + Send> Send for TicketLock<T> {}
unsafe impl<T: ?Sized + Send> Sync for TicketLock<T> {}

unsafe impl<T> LockIface for TicketLock<T>
where
    T: ?Sized,
{
    #[inline]
    fn lock(&self) {
        self.acquire();
    }

    #[inline]
    fn try_lock(&self) -> bool {
        self.try_acquire().is_some()
    }

    #[inline]
    fn is_locked(&self) -> bool {
        self.next_ticket.load() != self.serving.load()
    }

    #[inline]
    fn unlock(&self) {
        let next = self.serving.load().wrapping_add(1);
        self.serving.store_release(next);
    }
}
