//! Producer/consumer demo over a single block pool.
//!
//! Producers allocate blocks, stamp them and pass them over a channel; the
//! consumer checks the stamp and gives the block back with a checked free.
//! Run with `--verbose` to see every block go by.
#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(clippy::pedantic, clippy::nursery)]

mod logging;

use std::{ptr::NonNull, sync::mpsc, thread};

use blockpool::{
    Alignment, BlockAllocator, BlockPool, BlockReleaser, ENTRY_SIZE, PoolConfig,
};
use hyperring::locks::ticket::TicketLock;

const BLOCK_SIZE: usize = 64;
const BLOCK_COUNT: usize = 32;
const ARENA_SIZE: usize = BLOCK_COUNT * (BLOCK_SIZE + ENTRY_SIZE);

/// Blocks sent by each producer.
const MESSAGES: u32 = 1_000;
/// Producers sharing the allocator in the second phase.
const PRODUCERS: u32 = 3;

#[repr(C, align(64))]
struct Arena([u8; ARENA_SIZE]);

/// A block on its way from a producer to the consumer.
struct Message {
    block: NonNull<u8>,
    producer: u32,
    sequence: u32,
}

// Safety: a block belongs to whoever holds the message.
unsafe impl Send for Message {}

impl Message {
    fn stamp(block: NonNull<u8>, producer: u32, sequence: u32) -> Self {
        // Safety: the block was just allocated and is at least 8 bytes long.
        unsafe { block.cast::<[u32; 2]>().write_unaligned([producer, sequence]) };
        Self {
            block,
            producer,
            sequence,
        }
    }

    fn is_intact(&self) -> bool {
        // Safety: the block is still allocated, we hold the message.
        let stamp = unsafe { self.block.cast::<[u32; 2]>().read_unaligned() };
        stamp == [self.producer, self.sequence]
    }
}

fn main() {
    let verbose = std::env::args()
        .skip(1)
        .any(|arg| arg == "--verbose" || arg == "-v");
    logging::init(verbose);

    let mut arena = Arena([0; ARENA_SIZE]);
    let config = PoolConfig::new(Alignment::Align64, BLOCK_SIZE);
    let mut pool = match BlockPool::new(&mut arena.0, config) {
        Ok(pool) => pool,
        Err(err) => {
            log::error!("Failed to build the pool: {err}");
            std::process::exit(1);
        }
    };
    log::info!(
        "Pool of {} blocks of {} bytes, {} bytes of free list",
        pool.size(),
        pool.block_size(),
        pool.free_list_capacity()
    );

    single_producer(&mut pool);
    report(&pool, "single producer");

    shared_allocator(&mut pool);
    report(&pool, "shared allocator");

    double_free(&mut pool);
    report(&pool, "reset");
}

/// One allocating thread, one freeing thread, no lock.
fn single_producer(pool: &mut BlockPool<'_>) {
    let (mut allocator, mut releaser) = pool.split();
    let (sender, receiver) = mpsc::sync_channel::<Message>(BLOCK_COUNT);

    let consumed = thread::scope(|s| {
        s.spawn(move || {
            for sequence in 0..MESSAGES {
                let block = acquire(|| allocator.alloc().ok());
                if sender.send(Message::stamp(block, 0, sequence)).is_err() {
                    break;
                }
            }
        });

        let consumer = s.spawn(move || consume(&mut releaser, &receiver));
        consumer.join().unwrap_or_default()
    });

    log::info!("Single producer: {consumed} blocks went through");
}

/// Several allocating threads behind a ticket lock, one freeing thread.
fn shared_allocator(pool: &mut BlockPool<'_>) {
    let (allocator, mut releaser) = pool.split();
    let allocator: TicketLock<BlockAllocator<'_, '_>> = TicketLock::new(allocator);
    let (sender, receiver) = mpsc::sync_channel::<Message>(BLOCK_COUNT);

    let consumed = thread::scope(|s| {
        for producer in 0..PRODUCERS {
            let allocator = &allocator;
            let sender = sender.clone();
            s.spawn(move || {
                for sequence in 0..MESSAGES {
                    let block = acquire(|| allocator.with_locked(|a| a.alloc().ok()));
                    if sender.send(Message::stamp(block, producer, sequence)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(sender);

        let consumer = s.spawn(move || consume(&mut releaser, &receiver));
        consumer.join().unwrap_or_default()
    });

    log::info!("{PRODUCERS} producers: {consumed} blocks went through");
}

/// Retries `alloc` until the consumer has given a block back.
fn acquire(mut alloc: impl FnMut() -> Option<NonNull<u8>>) -> NonNull<u8> {
    loop {
        if let Some(block) = alloc() {
            return block;
        }
        log::trace!("Pool exhausted, waiting for the consumer");
        thread::yield_now();
    }
}

fn consume(releaser: &mut BlockReleaser<'_, '_>, receiver: &mpsc::Receiver<Message>) -> usize {
    let mut consumed = 0;
    for message in receiver {
        if !message.is_intact() {
            log::warn!(
                "Block {:p} from producer {} lost its stamp",
                message.block,
                message.producer
            );
        }
        log::debug!(
            "Block {:p} from producer {}, #{} ({} free)",
            message.block,
            message.producer,
            message.sequence,
            releaser.available()
        );

        if let Err(err) = releaser.free_checked(message.block) {
            log::error!("Freeing {:p} failed: {err}", message.block);
        }
        consumed += 1;
    }
    consumed
}

fn double_free(pool: &mut BlockPool<'_>) {
    let Ok(block) = pool.alloc() else {
        log::error!("No block left for the double free check");
        return;
    };

    let first = pool.free_checked(block);
    let second = pool.free_checked(block);
    log::info!("Freeing {block:p} twice: {first:?}, then {second:?}");

    pool.reset();
}

fn report(pool: &BlockPool<'_>, phase: &str) {
    log::info!(
        "After {phase}: {} used, {} free out of {}{}",
        pool.used(),
        pool.available(),
        pool.size(),
        if pool.is_exhausted() { " (exhausted)" } else { "" }
    );
}
