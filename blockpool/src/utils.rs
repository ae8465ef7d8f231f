/// Size of one free list entry.
pub const ENTRY_SIZE: usize = core::mem::size_of::<usize>();

/// Align `size` upwards to `align`.
///
/// Requires that `align` is a power of two. Returns `None` on overflow.
#[inline]
pub const fn align_up(size: usize, align: usize) -> Option<usize> {
    debug_assert!(align.is_power_of_two());
    match size.checked_add(align - 1) {
        Some(padded) => Some(padded & !(align - 1)),
        None => None,
    }
}

/// Bytes needed by a free list holding `count` entries.
///
/// This is the smallest power of two that fits `count` pointer-sized entries,
/// or `None` if it does not fit in a `usize`.
#[inline]
pub const fn free_list_bytes(count: usize) -> Option<usize> {
    match count.checked_mul(ENTRY_SIZE) {
        Some(bytes) => bytes.checked_next_power_of_two(),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 8), Some(0));
        assert_eq!(align_up(1, 8), Some(8));
        assert_eq!(align_up(7, 8), Some(8));
        assert_eq!(align_up(8, 8), Some(8));
        assert_eq!(align_up(9, 8), Some(16));
        assert_eq!(align_up(100, 16), Some(112));
        assert_eq!(align_up(usize::MAX, 4), None);
    }

    #[test]
    fn test_free_list_bytes() {
        assert_eq!(free_list_bytes(1), Some(ENTRY_SIZE));
        assert_eq!(free_list_bytes(2), Some(2 * ENTRY_SIZE));
        assert_eq!(free_list_bytes(3), Some(4 * ENTRY_SIZE));
        assert_eq!(free_list_bytes(16), Some(16 * ENTRY_SIZE));
        assert_eq!(free_list_bytes(17), Some(32 * ENTRY_SIZE));
        assert_eq!(free_list_bytes(usize::MAX), None);
    }
}
