//! Hyperring is the utility library behind `blockpool`.
//!
//! It provides the circular FIFO the pool keeps its free list in, along with
//! the few synchronization primitives needed around it.
#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(clippy::pedantic, clippy::nursery)]

pub mod locks;
pub mod queues;
