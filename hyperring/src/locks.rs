//! Locks related utilities.
//!
//! Nothing in the pool locks internally. These primitives are what callers wrap
//! around a pool handle when more than one context needs to allocate, or more
//! than one context needs to free.
//!
//! ## Modules
//!
//! - `ticket` : Provides an implementation of the ticket lock.
//!
//! ## Back-off Strategy
//!
//! Locks are generic over a `BackOff` strategy, called whenever a thread
//! is unable to acquire a lock. The default is a spin-wait loop.

pub mod ticket;

/// A trait that defines a back-off strategy for locks.
pub trait BackOff {
    /// Performs the back-off operation.
    fn back_off();
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// A back-off strategy that uses a spin-wait loop.
pub struct Spin;

impl BackOff for Spin {
    #[inline]
    fn back_off() {
        core::hint::spin_loop();
    }
}
