//! Ticket lock implementation.
//!
//! A ticket lock hands out increasing tickets and serves them in order, which
//! makes it fair: a context waiting to allocate cannot be starved by another
//! one that keeps re-acquiring the lock.
//!
//! It is meant for the low contention found around a pool handle shared by a
//! handful of tasks.
//!
//! # Example
//!
//! ```rust
//! # use hyperring::locks::ticket::TicketLock;
//! let lock = TicketLock::<u8>::new(0);
//!
//! let mut guard = lock.lock();
//! *guard = 42;
//! assert!(lock.try_lock().is_none());
//! drop(guard);
//!
//! assert_eq!(lock.with_locked(|value| *value), 42);
//! ```

use super::BackOff;
use core::{
    cell::UnsafeCell,
    marker::PhantomData,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicU32, Ordering},
};

/// A fair spin lock.
pub struct TicketLock<T, B: BackOff = super::Spin> {
    /// The next ticket to hand out.
    next_ticket: AtomicU32,
    /// The ticket currently allowed in.
    now_serving: AtomicU32,
    data: UnsafeCell<T>,
    _back_off: PhantomData<B>,
}

// Safety:
// Access to `data` is serialized by the tickets.
unsafe impl<T: Send, B: BackOff> Send for TicketLock<T, B> {}
unsafe impl<T: Send, B: BackOff> Sync for TicketLock<T, B> {}

impl<T, B: BackOff> TicketLock<T, B> {
    #[must_use]
    #[inline]
    pub const fn new(data: T) -> Self {
        Self {
            next_ticket: AtomicU32::new(0),
            now_serving: AtomicU32::new(0),
            data: UnsafeCell::new(data),
            _back_off: PhantomData,
        }
    }

    #[must_use]
    #[inline]
    /// Waits for our turn and returns a guard.
    pub fn lock(&self) -> TicketGuard<'_, T, B> {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);

        while self.now_serving.load(Ordering::Acquire) != ticket {
            B::back_off();
        }

        TicketGuard { lock: self }
    }

    #[must_use]
    #[inline]
    /// Takes the lock only if nobody holds it nor waits for it.
    pub fn try_lock(&self) -> Option<TicketGuard<'_, T, B>> {
        // Pairs with the release in `unlock`, the CAS alone does not.
        let serving = self.now_serving.load(Ordering::Acquire);
        self.next_ticket
            .compare_exchange(
                serving,
                serving.wrapping_add(1),
                Ordering::Acquire,
                Ordering::Relaxed,
            )
            .ok()
            .map(|_| TicketGuard { lock: self })
    }

    #[inline]
    /// Runs `f` with the lock held.
    pub fn with_locked<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.lock();
        f(&mut guard)
    }

    #[must_use]
    #[inline]
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }

    /// # Safety
    ///
    /// The caller must be the owner of the lock.
    #[inline]
    unsafe fn unlock(&self) {
        self.now_serving.fetch_add(1, Ordering::Release);
    }
}

/// RAII guard for the ticket lock.
pub struct TicketGuard<'l, T, B: BackOff> {
    lock: &'l TicketLock<T, B>,
}

impl<T, B: BackOff> Drop for TicketGuard<'_, T, B> {
    #[inline]
    fn drop(&mut self) {
        // Safety: If the guard exists, we have the lock.
        unsafe { self.lock.unlock() };
    }
}

impl<T, B: BackOff> Deref for TicketGuard<'_, T, B> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T, B: BackOff> DerefMut for TicketGuard<'_, T, B> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.lock.data.get() }
    }
}
