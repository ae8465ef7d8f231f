//! # Blockpool: Fixed-Size Block Allocator for `no_std` Environments
//!
//! Blockpool carves a caller-supplied arena into equal-sized, aligned blocks and
//! hands them out and takes them back in O(1). The arena is never grown, shrunk
//! nor compacted, and the pool never allocates anything itself.
//!
//! ## Architecture
//!
//! ```text
//!   arena (borrowed)
//!   ┌───────┬───────┬─────┬───────┬──────────────────┬────────┐
//!   │ blk 0 │ blk 1 │ ... │ blk n │ free list (ring) │ unused │
//!   └───────┴───────┴─────┴───────┴──────────────────┴────────┘
//!       ▲                               │
//!       └──── alloc() pops the head ────┘  free_*() push to the tail
//! ```
//!
//! - **Sizing**: the block count is the largest one for which the blocks and a
//!   power-of-two free list both fit in the arena.
//! - **Free list**: a lock-free byte ring (`hyperring`) holding one
//!   pointer-sized entry per free block, reused in FIFO order.
//! - **Checked free**: validates the address and scans the free list for
//!   double frees, O(free blocks).
//! - **Fast free**: no checks at all, an `unsafe` contract on the caller.
//!
//! ## Usage
//!
//! ```rust
//! use blockpool::{Alignment, BlockPool, PoolConfig, PoolError};
//!
//! let mut arena = [0u8; 4096];
//! let config = PoolConfig::new(Alignment::Align8, 128);
//! let mut pool = BlockPool::new(&mut arena, config).unwrap();
//!
//! let block = pool.alloc().unwrap();
//! unsafe { block.as_ptr().write_bytes(0xAA, pool.block_size()) };
//! assert_eq!(pool.used(), 1);
//!
//! pool.free_checked(block).unwrap();
//! assert_eq!(pool.free_checked(block), Err(PoolError::DoubleFree));
//! ```
//!
//! ## Concurrency
//!
//! Nothing locks internally. One context may allocate while another one frees
//! through the halves returned by `BlockPool::split`; anything beyond that
//! needs an external lock around the shared half.
#![warn(clippy::pedantic, clippy::nursery)]
#![forbid(unsafe_op_in_unsafe_fn)]
#![cfg_attr(not(test), no_std)]

mod config;
mod error;
mod pool;
mod sizing;
mod utils;

pub use config::{Alignment, PoolConfig};
pub use error::{PoolError, PoolResult};
pub use pool::{BlockAllocator, BlockPool, BlockReleaser};
pub use sizing::PoolGeometry;
pub use utils::ENTRY_SIZE;
