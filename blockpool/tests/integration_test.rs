//! Integration tests for the blockpool allocator

use core::ptr::NonNull;

use blockpool::{Alignment, BlockPool, ENTRY_SIZE, PoolConfig, PoolError};
use hashbrown::HashSet;

const BLOCK_SIZE: usize = 128;
const BLOCK_COUNT: usize = 16;
const ARENA_SIZE: usize = BLOCK_COUNT * (BLOCK_SIZE + ENTRY_SIZE);

#[repr(C, align(128))]
struct Arena([u8; ARENA_SIZE]);

impl Arena {
    const fn new() -> Self {
        Self([0; ARENA_SIZE])
    }
}

fn config() -> PoolConfig {
    PoolConfig::new(Alignment::Align8, BLOCK_SIZE)
}

fn offset(pool: &BlockPool<'_>, block: NonNull<u8>) -> usize {
    block.as_ptr().addr() - pool.base().as_ptr().addr()
}

#[test]
fn test_exact_fit_geometry() {
    let mut arena = Arena::new();
    let pool = BlockPool::new(&mut arena.0, config()).unwrap();

    assert_eq!(pool.block_size(), 128);
    assert_eq!(pool.size(), 16);
    assert_eq!(pool.free_list_capacity(), 16 * ENTRY_SIZE);
    assert_eq!(pool.used(), 0);
    assert_eq!(pool.available(), 16);
    assert!(!pool.is_exhausted());
    assert!(pool.geometry().footprint() <= ARENA_SIZE);
    drop(pool);

    // The free list starts right after the last block, seeded in ascending order.
    let mut entry = [0u8; ENTRY_SIZE];
    for index in 0..16 {
        let start = 16 * 128 + index * ENTRY_SIZE;
        entry.copy_from_slice(&arena.0[start..start + ENTRY_SIZE]);
        assert_eq!(usize::from_ne_bytes(entry), index * 128);
    }
}

#[test]
fn test_drain_pool() {
    let mut arena = Arena::new();
    let mut pool = BlockPool::new(&mut arena.0, config()).unwrap();

    let mut offsets = HashSet::new();
    for _ in 0..16 {
        let block = pool.alloc().unwrap();
        let offset = offset(&pool, block);

        assert!(offset < 2048);
        assert_eq!(offset % 128, 0);
        assert!(offsets.insert(offset));
    }

    assert_eq!(pool.alloc(), Err(PoolError::OutOfMemory));
    assert!(pool.is_exhausted());
    assert_eq!(pool.used(), 16);
    assert_eq!(pool.available(), 0);
}

#[test]
fn test_invalid_addresses() {
    let mut arena = Arena::new();
    let mut pool = BlockPool::new(&mut arena.0, config()).unwrap();
    let base = pool.base();

    let below = NonNull::new(base.as_ptr().wrapping_sub(1)).unwrap();
    assert_eq!(pool.free_checked(below), Err(PoolError::InvalidAddress));

    let misaligned = unsafe { base.add(129) };
    assert_eq!(pool.free_checked(misaligned), Err(PoolError::InvalidAddress));

    // First byte past the last block, where the free list lives.
    let past_end = unsafe { base.add(16 * 128) };
    assert_eq!(pool.free_checked(past_end), Err(PoolError::InvalidAddress));

    assert_eq!(pool.available(), 16);
}

#[test]
fn test_double_free() {
    let mut arena = Arena::new();
    let mut pool = BlockPool::new(&mut arena.0, config()).unwrap();

    let block = pool.alloc().unwrap();
    assert_eq!(pool.free_checked(block), Ok(()));
    assert_eq!(pool.free_checked(block), Err(PoolError::DoubleFree));

    // A block that was never allocated is free too.
    let never_allocated = unsafe { pool.base().add(5 * 128) };
    assert_eq!(pool.free_checked(never_allocated), Err(PoolError::DoubleFree));

    assert_eq!(pool.available(), 16);
}

#[test]
fn test_reset_restores_ascending_order() {
    let mut arena = Arena::new();
    let mut pool = BlockPool::new(&mut arena.0, config()).unwrap();

    // Shuffle the free list a bit.
    let mut blocks = Vec::new();
    for _ in 0..10 {
        blocks.push(pool.alloc().unwrap());
    }
    for block in blocks.iter().rev().step_by(2) {
        pool.free_checked(*block).unwrap();
    }
    let _ = pool.alloc().unwrap();

    pool.reset();
    assert_eq!(pool.available(), pool.size());
    assert_eq!(pool.available(), 16);

    for index in 0..16 {
        let block = pool.alloc().unwrap();
        assert_eq!(offset(&pool, block), index * 128);
    }
    assert!(pool.is_exhausted());
}

#[test]
fn test_reset_keeps_contents() {
    let mut arena = Arena::new();
    let mut pool = BlockPool::new(&mut arena.0, config()).unwrap();

    let block = pool.alloc().unwrap();
    unsafe { block.as_ptr().write_bytes(0x5A, 128) };

    pool.reset();
    let again = pool.alloc().unwrap();
    assert_eq!(again, block);
    assert_eq!(unsafe { again.as_ptr().add(127).read() }, 0x5A);
}

#[test]
fn test_fast_free_reuse() {
    let mut arena = Arena::new();
    let mut pool = BlockPool::new(&mut arena.0, config()).unwrap();

    let mut last = None;
    while let Ok(block) = pool.alloc() {
        last = Some(block);
    }
    let last = last.unwrap();

    unsafe { pool.free_fast(last) };
    assert_eq!(pool.alloc(), Ok(last));
}

#[test]
fn test_fast_free_has_no_safety_net() {
    let mut arena = Arena::new();
    let mut pool = BlockPool::new(&mut arena.0, config()).unwrap();

    let mut blocks = Vec::new();
    while let Ok(block) = pool.alloc() {
        blocks.push(block);
    }

    // Breaking the contract on purpose: the same block goes in twice.
    unsafe {
        pool.free_fast(blocks[3]);
        pool.free_fast(blocks[3]);
    }
    assert_eq!(pool.available(), 2);
    assert_eq!(pool.alloc(), Ok(blocks[3]));
    assert_eq!(pool.alloc(), Ok(blocks[3]));
}

#[test]
fn test_deterministic_geometry() {
    let mut first = Arena::new();
    let mut second = Arena::new();

    let a = BlockPool::new(&mut first.0, config()).unwrap();
    let b = BlockPool::new(&mut second.0, config()).unwrap();
    assert_eq!(a.geometry(), b.geometry());
}

#[test]
fn test_raw_config() {
    let mut arena = Arena::new();

    let config = PoolConfig::from_raw(64, 100).unwrap();
    let pool = BlockPool::new(&mut arena.0, config).unwrap();
    assert_eq!(pool.block_size(), 128);

    assert_eq!(PoolConfig::from_raw(2, 100), Err(PoolError::InvalidArgument));
    assert_eq!(PoolConfig::from_raw(8192, 100), Err(PoolError::InvalidArgument));
}

#[test]
fn test_stress_mixed_operations() {
    let mut arena = [0u8; 8192];
    let mut pool = BlockPool::new(&mut arena, PoolConfig::new(Alignment::Align16, 48)).unwrap();

    let mut live = Vec::new();
    let mut rng_state = 12345u32;

    // Simple LCG for deterministic testing
    let mut next_random = || {
        rng_state = rng_state.wrapping_mul(1_103_515_245).wrapping_add(12345);
        rng_state
    };

    for _ in 0..2_000 {
        if next_random() % 100 < 55 {
            match pool.alloc() {
                Ok(block) => live.push(block),
                Err(err) => {
                    assert_eq!(err, PoolError::OutOfMemory);
                    assert_eq!(live.len(), pool.size());
                }
            }
        } else if !live.is_empty() {
            let index = usize::try_from(next_random()).unwrap() % live.len();
            let block = live.swap_remove(index);
            pool.free_checked(block).unwrap();
        }

        assert_eq!(pool.used(), live.len());
        assert_eq!(pool.used() + pool.available(), pool.size());
    }

    let unique: HashSet<_> = live.iter().map(|block| block.as_ptr().addr()).collect();
    assert_eq!(unique.len(), live.len());
}
