//! A lock-free byte ring over borrowed storage.
//!
//! The ring never owns its memory: it is handed a power-of-two sized byte slice
//! (typically the tail of a larger arena) and keeps two free-running positions,
//! one per side. Offsets into the storage are obtained by masking, which is why
//! the capacity must be a power of two.
//!
//! Exactly one producer and one consumer may operate concurrently. On a plain
//! `ByteRing` this is enforced through `&mut self`; to run both sides at the same
//! time, `split` the ring into a `Producer` and a `Consumer`.
//!
//! # Usage
//!
//! ```rust
//! # use hyperring::queues::byte_ring::ByteRing;
//! #
//! let mut storage = [0u8; 8];
//! let mut ring = ByteRing::new(&mut storage).unwrap();
//!
//! assert_eq!(ring.write(&[1, 2, 3]), 3);
//! assert_eq!(ring.len(), 3);
//!
//! // Peeking does not consume anything.
//! let mut cursor = ring.cursor();
//! let mut byte = [0u8; 1];
//! assert_eq!(ring.peek(&mut cursor, &mut byte), 1);
//! assert_eq!(byte, [1]);
//! assert_eq!(ring.len(), 3);
//!
//! let mut out = [0u8; 4];
//! assert_eq!(ring.read(&mut out), 3);
//! assert_eq!(&out[..3], &[1, 2, 3]);
//! assert!(ring.is_empty());
//! ```
use core::{
    marker::PhantomData,
    ptr::{self, NonNull},
    sync::atomic::{AtomicUsize, Ordering},
};
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
/// Errors returned when building a ring over unsuitable storage.
pub enum RingInitError {
    #[error("Ring storage is empty")]
    Empty,
    #[error("Ring capacity must be a power of two")]
    NotPowerOfTwo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// A private read position, used to walk the ring without consuming it.
///
/// A cursor that falls more than one lap behind the writer, or that was taken
/// before a `reset`, yields nothing.
pub struct Cursor(usize);

/// A single-producer single-consumer byte ring.
pub struct ByteRing<'a> {
    /// Start of the borrowed storage.
    storage: NonNull<u8>,
    /// `capacity - 1`.
    mask: usize,
    /// Number of bytes ever written. Only the producer stores to it.
    write_pos: AtomicUsize,
    /// Number of bytes ever read. Only the consumer stores to it.
    read_pos: AtomicUsize,
    _storage: PhantomData<&'a mut [u8]>,
}

// Safety:
// Shared references only allow reading the positions and the committed bytes.
// Mutation goes through `&mut self` or through the split halves, of which
// there is exactly one of each.
#[expect(
    clippy::non_send_fields_in_send_ty,
    reason = "The storage pointer is only dereferenced under the SPSC discipline"
)]
unsafe impl Send for ByteRing<'_> {}
unsafe impl Sync for ByteRing<'_> {}

impl core::fmt::Debug for ByteRing<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ByteRing")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl<'a> ByteRing<'a> {
    /// Creates a ring over `storage`.
    ///
    /// # Errors
    ///
    /// Fails if `storage` is empty or its length is not a power of two.
    pub fn new(storage: &'a mut [u8]) -> Result<Self, RingInitError> {
        let capacity = storage.len();
        let start = NonNull::from(storage).cast::<u8>();
        // Safety: the slice is valid for `capacity` bytes and borrowed for `'a`.
        unsafe { Self::from_raw_parts(start, capacity) }
    }

    /// Creates a ring over `capacity` bytes starting at `storage`.
    ///
    /// # Safety
    ///
    /// - `storage` must be valid for reads and writes for `capacity` bytes
    /// - The memory must not be accessed by other code for `'a`
    ///
    /// # Errors
    ///
    /// Fails if `capacity` is zero or not a power of two.
    pub unsafe fn from_raw_parts(
        storage: NonNull<u8>,
        capacity: usize,
    ) -> Result<Self, RingInitError> {
        if capacity == 0 {
            return Err(RingInitError::Empty);
        }
        if !capacity.is_power_of_two() {
            return Err(RingInitError::NotPowerOfTwo);
        }

        Ok(Self {
            storage,
            mask: capacity - 1,
            write_pos: AtomicUsize::new(0),
            read_pos: AtomicUsize::new(0),
            _storage: PhantomData,
        })
    }

    #[must_use]
    #[inline]
    /// Returns the capacity of the ring in bytes.
    pub const fn capacity(&self) -> usize {
        self.mask + 1
    }

    #[must_use]
    #[inline]
    /// Returns the number of bytes currently stored.
    ///
    /// Under concurrent use this is a snapshot: it may be stale, but it is
    /// always within `0..=capacity`.
    pub fn len(&self) -> usize {
        // Reading the consumer first keeps `write - read` from going negative.
        let read = self.read_pos.load(Ordering::Acquire);
        let write = self.write_pos.load(Ordering::Acquire);
        write.wrapping_sub(read).min(self.capacity())
    }

    #[must_use]
    #[inline]
    /// Returns the number of bytes that can still be written.
    pub fn free_space(&self) -> usize {
        self.capacity() - self.len()
    }

    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    /// Drops every stored byte.
    pub fn reset(&mut self) {
        *self.write_pos.get_mut() = 0;
        *self.read_pos.get_mut() = 0;
    }

    /// Appends as much of `data` as fits and returns the number of bytes written.
    pub fn write(&mut self, data: &[u8]) -> usize {
        // Safety: `&mut self` makes us the only producer.
        unsafe { self.produce(data) }
    }

    /// Consumes up to `out.len()` bytes from the head and returns how many were read.
    pub fn read(&mut self, out: &mut [u8]) -> usize {
        // Safety: `&mut self` makes us the only consumer.
        unsafe { self.consume(out) }
    }

    #[must_use]
    #[inline]
    /// Returns a cursor positioned at the current head.
    pub fn cursor(&self) -> Cursor {
        Cursor(self.read_pos.load(Ordering::Acquire))
    }

    /// Copies up to `out.len()` bytes starting at `cursor`, then advances the cursor.
    ///
    /// The shared head is left untouched.
    pub fn peek(&self, cursor: &mut Cursor, out: &mut [u8]) -> usize {
        let write = self.write_pos.load(Ordering::Acquire);
        let pending = write.wrapping_sub(cursor.0);
        if pending > self.capacity() {
            return 0;
        }

        let len = out.len().min(pending);
        // Safety: bytes in `cursor..write` have been published by the producer.
        unsafe { self.copy_out(cursor.0, &mut out[..len]) };
        cursor.0 = cursor.0.wrapping_add(len);
        len
    }

    #[must_use]
    /// Splits the ring into its producing and consuming halves.
    pub fn split(&mut self) -> (Producer<'_, 'a>, Consumer<'_, 'a>) {
        let ring: &Self = self;
        (Producer { ring }, Consumer { ring })
    }

    /// # Safety
    ///
    /// There must be no other producer running concurrently.
    unsafe fn produce(&self, data: &[u8]) -> usize {
        let write = self.write_pos.load(Ordering::Relaxed);
        let read = self.read_pos.load(Ordering::Acquire);
        let free = self.capacity() - write.wrapping_sub(read);

        let len = data.len().min(free);
        // Safety: `write..write + len` is free space, the consumer never touches it.
        unsafe { self.copy_in(write, &data[..len]) };
        self.write_pos
            .store(write.wrapping_add(len), Ordering::Release);
        len
    }

    /// # Safety
    ///
    /// There must be no other consumer running concurrently.
    unsafe fn consume(&self, out: &mut [u8]) -> usize {
        let read = self.read_pos.load(Ordering::Relaxed);
        let write = self.write_pos.load(Ordering::Acquire);

        let len = out.len().min(write.wrapping_sub(read));
        // Safety: `read..read + len` has been published, the producer won't overwrite it
        // before we release it.
        unsafe { self.copy_out(read, &mut out[..len]) };
        self.read_pos.store(read.wrapping_add(len), Ordering::Release);
        len
    }

    /// # Safety
    ///
    /// `data.len()` must not exceed the capacity and the target bytes must not be
    /// accessed concurrently.
    unsafe fn copy_in(&self, pos: usize, data: &[u8]) {
        let offset = pos & self.mask;
        let first = data.len().min(self.capacity() - offset);
        let base = self.storage.as_ptr();
        unsafe {
            ptr::copy_nonoverlapping(data.as_ptr(), base.add(offset), first);
            ptr::copy_nonoverlapping(data.as_ptr().add(first), base, data.len() - first);
        }
    }

    /// # Safety
    ///
    /// `out.len()` must not exceed the capacity and the source bytes must not be
    /// written concurrently.
    unsafe fn copy_out(&self, pos: usize, out: &mut [u8]) {
        let offset = pos & self.mask;
        let first = out.len().min(self.capacity() - offset);
        let base = self.storage.as_ptr();
        unsafe {
            ptr::copy_nonoverlapping(base.add(offset), out.as_mut_ptr(), first);
            ptr::copy_nonoverlapping(base, out.as_mut_ptr().add(first), out.len() - first);
        }
    }
}

#[derive(Debug)]
/// The writing half of a split `ByteRing`.
pub struct Producer<'r, 'a> {
    ring: &'r ByteRing<'a>,
}

impl Producer<'_, '_> {
    /// See `ByteRing::write`.
    pub fn write(&mut self, data: &[u8]) -> usize {
        // Safety: there is only one `Producer` per split and it is borrowed mutably.
        unsafe { self.ring.produce(data) }
    }

    #[must_use]
    #[inline]
    pub fn cursor(&self) -> Cursor {
        self.ring.cursor()
    }

    /// See `ByteRing::peek`.
    ///
    /// Bytes visited here cannot be overwritten while peeking since this half is
    /// the only writer. The consumer may still drain them in the meantime, in
    /// which case the walk reports entries that are already gone.
    pub fn peek(&self, cursor: &mut Cursor, out: &mut [u8]) -> usize {
        self.ring.peek(cursor, out)
    }

    #[must_use]
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    #[must_use]
    #[inline]
    pub fn free_space(&self) -> usize {
        self.ring.free_space()
    }
}

#[derive(Debug)]
/// The reading half of a split `ByteRing`.
pub struct Consumer<'r, 'a> {
    ring: &'r ByteRing<'a>,
}

impl Consumer<'_, '_> {
    /// See `ByteRing::read`.
    pub fn read(&mut self, out: &mut [u8]) -> usize {
        // Safety: there is only one `Consumer` per split and it is borrowed mutably.
        unsafe { self.ring.consume(out) }
    }

    #[must_use]
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}
