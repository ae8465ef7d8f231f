//! Pool configuration.
//!
//! A pool is configured by the block alignment and the requested block size.
//! The arena itself is supplied separately when the pool is created.

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::{PoolError, PoolResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u16)]
/// Supported block alignments, in bytes.
pub enum Alignment {
    Align4 = 4,
    Align8 = 8,
    Align16 = 16,
    Align32 = 32,
    Align64 = 64,
    Align128 = 128,
    Align256 = 256,
    Align512 = 512,
    Align1024 = 1024,
    Align2048 = 2048,
    Align4096 = 4096,
}

impl Alignment {
    /// Smallest supported shift, `1 << 2 == 4` bytes.
    pub const MIN_SHIFT: u32 = 2;
    /// Largest supported shift, `1 << 12 == 4096` bytes.
    pub const MAX_SHIFT: u32 = 12;

    #[must_use]
    #[inline]
    pub const fn bytes(self) -> usize {
        self as usize
    }

    #[must_use]
    #[inline]
    /// Returns `log2` of the alignment.
    pub const fn shift(self) -> u32 {
        (self as u16).trailing_zeros()
    }

    /// Builds an alignment from its `log2`, e.g. `3` for 8 bytes.
    ///
    /// # Errors
    ///
    /// `PoolError::InvalidArgument` if `shift` is outside `MIN_SHIFT..=MAX_SHIFT`.
    pub fn from_shift(shift: u32) -> PoolResult<Self> {
        if !(Self::MIN_SHIFT..=Self::MAX_SHIFT).contains(&shift) {
            return Err(PoolError::InvalidArgument);
        }
        Self::try_from(1u16 << shift).map_err(|_| PoolError::InvalidArgument)
    }

    /// Builds an alignment from a byte count.
    ///
    /// # Errors
    ///
    /// `PoolError::InvalidArgument` if `bytes` is not a supported alignment.
    pub fn from_bytes(bytes: usize) -> PoolResult<Self> {
        u16::try_from(bytes)
            .ok()
            .and_then(|bytes| Self::try_from(bytes).ok())
            .ok_or(PoolError::InvalidArgument)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// What the pool carves the arena into.
pub struct PoolConfig {
    alignment: Alignment,
    block_size: usize,
}

impl PoolConfig {
    #[must_use]
    #[inline]
    /// Creates a configuration.
    ///
    /// A zero `block_size` is accepted here and rejected when the pool is built.
    pub const fn new(alignment: Alignment, block_size: usize) -> Self {
        Self {
            alignment,
            block_size,
        }
    }

    /// Creates a configuration from raw numbers, as found in a C-style API.
    ///
    /// # Errors
    ///
    /// `PoolError::InvalidArgument` if `align_bytes` is not a supported alignment
    /// or `block_size` is zero.
    pub fn from_raw(align_bytes: usize, block_size: usize) -> PoolResult<Self> {
        if block_size == 0 {
            return Err(PoolError::InvalidArgument);
        }
        Ok(Self::new(Alignment::from_bytes(align_bytes)?, block_size))
    }

    #[must_use]
    #[inline]
    pub const fn alignment(&self) -> Alignment {
        self.alignment
    }

    #[must_use]
    #[inline]
    /// Returns the block size as requested, before alignment.
    pub const fn block_size(&self) -> usize {
        self.block_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment_bytes_and_shift() {
        assert_eq!(Alignment::Align4.bytes(), 4);
        assert_eq!(Alignment::Align4.shift(), 2);
        assert_eq!(Alignment::Align4096.bytes(), 4096);
        assert_eq!(Alignment::Align4096.shift(), 12);
    }

    #[test]
    fn test_alignment_from_shift() {
        assert_eq!(Alignment::from_shift(3), Ok(Alignment::Align8));
        assert_eq!(Alignment::from_shift(12), Ok(Alignment::Align4096));
        assert_eq!(Alignment::from_shift(1), Err(PoolError::InvalidArgument));
        assert_eq!(Alignment::from_shift(13), Err(PoolError::InvalidArgument));
    }

    #[test]
    fn test_alignment_from_bytes() {
        for shift in Alignment::MIN_SHIFT..=Alignment::MAX_SHIFT {
            let alignment = Alignment::from_bytes(1 << shift).unwrap();
            assert_eq!(alignment.shift(), shift);
        }

        assert_eq!(Alignment::from_bytes(2), Err(PoolError::InvalidArgument));
        assert_eq!(Alignment::from_bytes(24), Err(PoolError::InvalidArgument));
        assert_eq!(Alignment::from_bytes(8192), Err(PoolError::InvalidArgument));
        assert_eq!(
            Alignment::from_bytes(usize::MAX),
            Err(PoolError::InvalidArgument)
        );
    }

    #[test]
    fn test_config_from_raw() {
        let config = PoolConfig::from_raw(16, 100).unwrap();
        assert_eq!(config.alignment(), Alignment::Align16);
        assert_eq!(config.block_size(), 100);

        assert_eq!(PoolConfig::from_raw(16, 0), Err(PoolError::InvalidArgument));
        assert_eq!(PoolConfig::from_raw(3, 8), Err(PoolError::InvalidArgument));
    }
}
