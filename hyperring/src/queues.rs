//! Queues module.
//!
//! Queues are FIFO data structures.
//!
//! ## Modules
//!
//! - `byte_ring` : Single-producer single-consumer byte ring over borrowed storage.

pub mod byte_ring;
