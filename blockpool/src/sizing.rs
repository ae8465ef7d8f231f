//! Arena sizing
//!
//! Splits an arena into a block region followed by the free list:
//!
//! ```text
//!   ┌─────────┬─────────┬─────┬─────────┬───────────────────┬────────┐
//!   │ block 0 │ block 1 │ ... │ block n │ free list (2^k B) │ wasted │
//!   └─────────┴─────────┴─────┴─────────┴───────────────────┴────────┘
//! ```
//!
//! The block count starts at `arena_size / block_size` and is decreased one by
//! one until the power-of-two free list fits in what is left. The outcome only
//! depends on the inputs.

use crate::{
    config::PoolConfig,
    error::{PoolError, PoolResult},
    utils::{align_up, free_list_bytes},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// The converged layout of a pool.
pub struct PoolGeometry {
    /// Block size, rounded up to the alignment.
    block_size: usize,
    /// Number of usable blocks.
    block_count: usize,
    /// Free list size in bytes, always a power of two.
    free_list_capacity: usize,
}

impl PoolGeometry {
    /// Computes the layout of a pool over `arena_size` bytes.
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidArgument` if the block size or the arena size is zero
    /// - `PoolError::OutOfSpace` if not even one block and its free list entry fit
    pub fn compute(config: &PoolConfig, arena_size: usize) -> PoolResult<Self> {
        if config.block_size() == 0 || arena_size == 0 {
            return Err(PoolError::InvalidArgument);
        }

        // A block size that overflows when aligned cannot fit any arena.
        let block_size = align_up(config.block_size(), config.alignment().bytes())
            .ok_or(PoolError::OutOfSpace)?;

        let mut block_count = arena_size / block_size;
        loop {
            if block_count == 0 {
                return Err(PoolError::OutOfSpace);
            }

            let remaining = arena_size - block_count * block_size;
            match free_list_bytes(block_count) {
                Some(free_list_capacity) if free_list_capacity <= remaining => {
                    return Ok(Self {
                        block_size,
                        block_count,
                        free_list_capacity,
                    });
                }
                _ => block_count -= 1,
            }
        }
    }

    #[must_use]
    #[inline]
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    #[must_use]
    #[inline]
    pub const fn block_count(&self) -> usize {
        self.block_count
    }

    #[must_use]
    #[inline]
    pub const fn free_list_capacity(&self) -> usize {
        self.free_list_capacity
    }

    #[must_use]
    #[inline]
    /// Size of the block region, which is also the offset of the free list.
    pub const fn blocks_bytes(&self) -> usize {
        self.block_count * self.block_size
    }

    #[must_use]
    #[inline]
    /// Bytes of the arena actually used, blocks and free list together.
    pub const fn footprint(&self) -> usize {
        self.blocks_bytes() + self.free_list_capacity
    }

    #[must_use]
    #[inline]
    /// Trailing bytes of an `arena_size` arena left unused.
    pub const fn wasted(&self, arena_size: usize) -> usize {
        arena_size.saturating_sub(self.footprint())
    }
}
