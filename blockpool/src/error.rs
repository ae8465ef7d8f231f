use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
/// Errors that can occur during block pool operations.
pub enum PoolError {
    /// Zero block size, empty arena or unsupported alignment.
    #[error("Invalid argument")]
    InvalidArgument,
    /// The arena cannot hold a single block plus its free list entry.
    #[error("Arena too small for one block and its free list")]
    OutOfSpace,
    /// Every block is allocated.
    #[error("No free block left")]
    OutOfMemory,
    /// The address is outside the block region or not on a block boundary.
    #[error("Address is not a block of this pool")]
    InvalidAddress,
    /// The block is already in the free list.
    #[error("Block is already free")]
    DoubleFree,
    /// The free list refused a full entry, its state is corrupted.
    #[error("Free list capacity violated")]
    InternalError,
}

pub type PoolResult<T> = core::result::Result<T, PoolError>;
