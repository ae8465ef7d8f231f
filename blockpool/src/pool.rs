//! The block pool.
//!
//! Blocks are handed out in FIFO order from a free list stored in the tail of
//! the arena. Entries are pointer-sized byte offsets relative to the first
//! block; real addresses only exist at the public boundary.
//!
//! ## Concurrency
//!
//! There is no locking here. Methods on `BlockPool` take `&mut self`, so a bare
//! pool is used from one context at a time. To allocate in one context while
//! freeing in another, `split` the pool: the `BlockAllocator` consumes the free
//! list, the `BlockReleaser` produces into it, and the ring's acquire/release
//! ordering is all the synchronization they need.
//!
//! More than one allocating context, or more than one freeing context, needs
//! the corresponding handle to be wrapped in a lock (e.g.
//! `hyperring::locks::ticket::TicketLock`). `reset` needs the whole pool, which
//! the borrow checker enforces while a split is alive.

use core::{marker::PhantomData, ptr::NonNull};
use hyperring::queues::byte_ring::{ByteRing, Consumer, Producer};

use crate::{
    config::PoolConfig,
    error::{PoolError, PoolResult},
    sizing::PoolGeometry,
    utils::ENTRY_SIZE,
};

#[derive(Debug, Clone, Copy)]
/// The block region of the arena.
struct Region {
    base: NonNull<u8>,
    block_size: usize,
    block_count: usize,
}

// Safety:
// `Region` only does address arithmetic, it never dereferences `base`.
unsafe impl Send for Region {}
unsafe impl Sync for Region {}

impl Region {
    /// Returns the offset of `block` if it is the start of one of our blocks.
    fn offset_of(&self, block: NonNull<u8>) -> PoolResult<usize> {
        let offset = block
            .as_ptr()
            .addr()
            .checked_sub(self.base.as_ptr().addr())
            .ok_or(PoolError::InvalidAddress)?;

        if !offset.is_multiple_of(self.block_size) || offset / self.block_size >= self.block_count {
            return Err(PoolError::InvalidAddress);
        }

        Ok(offset)
    }

    #[inline]
    fn offset_unchecked(&self, block: NonNull<u8>) -> usize {
        block.as_ptr().addr().wrapping_sub(self.base.as_ptr().addr())
    }

    /// Turns a free list entry back into an address.
    ///
    /// Entries pushed by a misused `free_fast` may point anywhere, so this only
    /// does wrapping arithmetic and leaves any fault to whoever dereferences.
    #[inline]
    fn block_at(&self, offset: usize) -> PoolResult<NonNull<u8>> {
        NonNull::new(self.base.as_ptr().wrapping_add(offset)).ok_or(PoolError::InternalError)
    }
}

#[inline]
const fn entries(bytes: usize) -> usize {
    bytes / ENTRY_SIZE
}

/// A fixed-size block allocator over a borrowed arena.
#[derive(Debug)]
pub struct BlockPool<'a> {
    geometry: PoolGeometry,
    region: Region,
    free_list: ByteRing<'a>,
    _arena: PhantomData<&'a mut [u8]>,
}

impl<'a> BlockPool<'a> {
    /// Carves `arena` into blocks and marks all of them free.
    ///
    /// The arena stays borrowed for the lifetime of the pool and is never
    /// resized. Its alignment is the caller's business: blocks are aligned
    /// relative to the start of the arena.
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidArgument` if the arena or the block size is empty
    /// - `PoolError::OutOfSpace` if the arena cannot hold one block and its free list
    pub fn new(arena: &'a mut [u8], config: PoolConfig) -> PoolResult<Self> {
        let arena_size = arena.len();
        let geometry = PoolGeometry::compute(&config, arena_size)?;

        let (blocks, tail) = arena.split_at_mut(geometry.blocks_bytes());
        let free_list = ByteRing::new(&mut tail[..geometry.free_list_capacity()])
            .map_err(|_| PoolError::InternalError)?;

        let region = Region {
            base: NonNull::from(blocks).cast::<u8>(),
            block_size: geometry.block_size(),
            block_count: geometry.block_count(),
        };

        let mut pool = Self {
            geometry,
            region,
            free_list,
            _arena: PhantomData,
        };
        pool.fill();

        log::debug!(
            "Block pool ready: {} blocks of {} bytes, {} bytes of free list, {} bytes unused",
            geometry.block_count(),
            geometry.block_size(),
            geometry.free_list_capacity(),
            geometry.wasted(arena_size),
        );

        Ok(pool)
    }

    /// Builds a pool over `size` bytes starting at `arena`.
    ///
    /// # Safety
    ///
    /// - `arena` must be valid for reads and writes for `size` bytes
    /// - The memory region must not be used by other code while the pool is alive
    ///
    /// # Errors
    ///
    /// See `BlockPool::new`.
    pub unsafe fn from_raw_parts(
        arena: NonNull<u8>,
        size: usize,
        config: PoolConfig,
    ) -> PoolResult<Self> {
        // Safety: guaranteed by the caller.
        let arena = unsafe { core::slice::from_raw_parts_mut(arena.as_ptr(), size) };
        Self::new(arena, config)
    }

    /// Marks every block free again, in ascending address order.
    ///
    /// Block contents are left untouched.
    pub fn reset(&mut self) {
        self.fill();
        log::debug!("Block pool reset: {} blocks free", self.size());
    }

    fn fill(&mut self) {
        self.free_list.reset();
        for index in 0..self.region.block_count {
            let offset = index * self.region.block_size;
            let written = self.free_list.write(&offset.to_ne_bytes());
            debug_assert_eq!(written, ENTRY_SIZE);
        }
    }

    #[must_use]
    /// Splits the pool into its allocating and freeing halves.
    ///
    /// Each half may live in a different execution context.
    pub fn split(&mut self) -> (BlockAllocator<'_, 'a>, BlockReleaser<'_, 'a>) {
        let region = self.region;
        let (producer, consumer) = self.free_list.split();
        (
            BlockAllocator {
                region,
                free_list: consumer,
            },
            BlockReleaser {
                region,
                free_list: producer,
            },
        )
    }

    /// Takes the oldest free block.
    ///
    /// # Errors
    ///
    /// `PoolError::OutOfMemory` if every block is allocated.
    pub fn alloc(&mut self) -> PoolResult<NonNull<u8>> {
        self.split().0.alloc()
    }

    /// Returns `block` to the pool after validating it.
    ///
    /// # Errors
    ///
    /// See `BlockReleaser::free_checked`.
    pub fn free_checked(&mut self, block: NonNull<u8>) -> PoolResult<()> {
        self.split().1.free_checked(block)
    }

    /// Returns `block` to the pool without any check.
    ///
    /// # Safety
    ///
    /// See `BlockReleaser::free_fast`.
    pub unsafe fn free_fast(&mut self, block: NonNull<u8>) {
        unsafe { self.split().1.free_fast(block) };
    }

    #[must_use]
    #[inline]
    /// Total number of blocks.
    pub const fn size(&self) -> usize {
        self.region.block_count
    }

    #[must_use]
    #[inline]
    /// Number of blocks currently allocated.
    pub fn used(&self) -> usize {
        self.size().saturating_sub(self.available())
    }

    #[must_use]
    #[inline]
    /// Number of blocks currently free.
    pub fn available(&self) -> usize {
        entries(self.free_list.len())
    }

    #[must_use]
    #[inline]
    /// Returns true if no block is left to allocate.
    pub fn is_exhausted(&self) -> bool {
        self.free_list.is_empty()
    }

    #[must_use]
    #[inline]
    /// Block size after alignment.
    pub const fn block_size(&self) -> usize {
        self.region.block_size
    }

    #[must_use]
    #[inline]
    pub const fn free_list_capacity(&self) -> usize {
        self.geometry.free_list_capacity()
    }

    #[must_use]
    #[inline]
    pub const fn geometry(&self) -> &PoolGeometry {
        &self.geometry
    }

    #[must_use]
    #[inline]
    /// Address of the first block.
    pub const fn base(&self) -> NonNull<u8> {
        self.region.base
    }

    #[must_use]
    #[inline]
    /// Returns true if `block` is the start of one of the pool's blocks.
    pub fn contains(&self, block: NonNull<u8>) -> bool {
        self.region.offset_of(block).is_ok()
    }
}

#[derive(Debug)]
/// The allocating half of a split pool.
pub struct BlockAllocator<'p, 'a> {
    region: Region,
    free_list: Consumer<'p, 'a>,
}

impl BlockAllocator<'_, '_> {
    /// Takes the oldest free block.
    ///
    /// Never blocks nor retries.
    ///
    /// # Errors
    ///
    /// `PoolError::OutOfMemory` if every block is allocated.
    pub fn alloc(&mut self) -> PoolResult<NonNull<u8>> {
        let mut entry = [0u8; ENTRY_SIZE];
        if self.free_list.read(&mut entry) != ENTRY_SIZE {
            return Err(PoolError::OutOfMemory);
        }
        self.region.block_at(usize::from_ne_bytes(entry))
    }

    #[must_use]
    #[inline]
    pub const fn size(&self) -> usize {
        self.region.block_count
    }

    #[must_use]
    #[inline]
    pub fn used(&self) -> usize {
        self.size().saturating_sub(self.available())
    }

    #[must_use]
    #[inline]
    pub fn available(&self) -> usize {
        entries(self.free_list.len())
    }

    #[must_use]
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.free_list.is_empty()
    }
}

#[derive(Debug)]
/// The freeing half of a split pool.
pub struct BlockReleaser<'p, 'a> {
    region: Region,
    free_list: Producer<'p, 'a>,
}

impl BlockReleaser<'_, '_> {
    /// Returns `block` to the pool after validating it.
    ///
    /// The double free check walks the whole free list, so this is O(free blocks).
    /// If the allocating half runs at the same time, the walk may still see
    /// entries it has just taken. A block the caller received from `alloc` has
    /// left the list before it could be handed over, so it is never among them.
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidAddress` if `block` is not the start of one of our blocks
    /// - `PoolError::DoubleFree` if `block` is already free
    /// - `PoolError::InternalError` if the free list could not take the entry
    pub fn free_checked(&mut self, block: NonNull<u8>) -> PoolResult<()> {
        let offset = self.region.offset_of(block)?;

        if self.is_free(offset) {
            return Err(PoolError::DoubleFree);
        }

        if self.free_list.write(&offset.to_ne_bytes()) != ENTRY_SIZE {
            return Err(PoolError::InternalError);
        }

        Ok(())
    }

    /// Returns `block` to the pool without any check.
    ///
    /// # Safety
    ///
    /// `block` must have been returned by `alloc` on this pool and must not have
    /// been freed since. Otherwise the free list ends up holding a duplicate or
    /// a foreign entry, and later allocations hand out aliasing or dangling
    /// blocks.
    pub unsafe fn free_fast(&mut self, block: NonNull<u8>) {
        let offset = self.region.offset_unchecked(block);
        self.free_list.write(&offset.to_ne_bytes());
    }

    /// Walks the free list without consuming it.
    fn is_free(&self, offset: usize) -> bool {
        let mut cursor = self.free_list.cursor();
        let mut entry = [0u8; ENTRY_SIZE];
        while self.free_list.peek(&mut cursor, &mut entry) == ENTRY_SIZE {
            if usize::from_ne_bytes(entry) == offset {
                return true;
            }
        }
        false
    }

    #[must_use]
    #[inline]
    pub const fn size(&self) -> usize {
        self.region.block_count
    }

    #[must_use]
    #[inline]
    pub fn used(&self) -> usize {
        self.size().saturating_sub(self.available())
    }

    #[must_use]
    #[inline]
    pub fn available(&self) -> usize {
        entries(self.free_list.len())
    }

    #[must_use]
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.free_list.is_empty()
    }
}
