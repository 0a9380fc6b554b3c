//! Page-aligned owned byte buffers for direct I/O
//!
//! `O_DIRECT` reads and writes are rejected by the kernel unless the user
//! buffer starts on the device's logical block boundary. [`AlignedBuf`]
//! guarantees a [`ALIGNMENT`]-byte aligned start address and a capacity
//! rounded up to a multiple of [`ALIGNMENT`], and releases its allocation when
//! dropped.
//!
//! The buffer implements compio's `IoBuf`/`IoBufMut`, so it can be handed
//! straight to io_uring reads and writes.

use crate::error::{invalid_parameters_error, Result};
use compio::buf::{IoBuf, IoBufMut, SetBufInit};
use std::alloc::{self, Layout};
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

/// Alignment boundary for buffers, offsets and lengths used with direct I/O
pub const ALIGNMENT: usize = 4096;

/// Round `len` up to the next multiple of [`ALIGNMENT`]
#[must_use]
pub const fn align_up(len: usize) -> usize {
    (len + ALIGNMENT - 1) & !(ALIGNMENT - 1)
}

/// Whether `value` is a multiple of [`ALIGNMENT`]
#[must_use]
pub const fn is_aligned(value: u64) -> bool {
    value % ALIGNMENT as u64 == 0
}

/// Owned, zero-initialised buffer aligned to [`ALIGNMENT`]
///
/// The logical length (`len`) may be smaller than the allocated capacity,
/// e.g. after a read that hit end-of-file. Only the first `len` bytes are
/// visible through `Deref`.
pub struct AlignedBuf {
    ptr: NonNull<u8>,
    len: usize,
    layout: Layout,
}

// SAFETY: the buffer uniquely owns its allocation; moving it to another thread
// moves that ownership along with it.
unsafe impl Send for AlignedBuf {}
// SAFETY: shared references only permit reads of initialised bytes.
unsafe impl Sync for AlignedBuf {}

impl AlignedBuf {
    /// Allocate a zeroed buffer of `len` bytes
    ///
    /// The capacity is `len` rounded up to [`ALIGNMENT`], never less than one
    /// block, so a zero-length buffer still owns a valid aligned allocation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameters` if the rounded size overflows the layout
    /// limits, and `Io(OutOfMemory)` if the allocator fails.
    pub fn zeroed(len: usize) -> Result<Self> {
        let capacity = len
            .checked_next_multiple_of(ALIGNMENT)
            .ok_or_else(|| invalid_parameters_error(&format!("buffer of {len} bytes")))?
            .max(ALIGNMENT);
        let layout = Layout::from_size_align(capacity, ALIGNMENT)
            .map_err(|e| invalid_parameters_error(&format!("buffer layout: {e}")))?;

        // SAFETY: layout has a non-zero size
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::OutOfMemory,
                format!("failed to allocate {capacity} aligned bytes"),
            )
        })?;

        Ok(Self { ptr, len, layout })
    }

    /// Allocate an empty buffer that can receive `capacity` bytes
    ///
    /// Reads into the buffer grow its length; see `SetBufInit`.
    ///
    /// # Errors
    ///
    /// Same as [`AlignedBuf::zeroed`].
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut buf = Self::zeroed(capacity)?;
        buf.len = 0;
        Ok(buf)
    }

    /// Allocate an aligned copy of `bytes`
    ///
    /// # Errors
    ///
    /// Same as [`AlignedBuf::zeroed`].
    pub fn copy_from_slice(bytes: &[u8]) -> Result<Self> {
        let mut buf = Self::zeroed(bytes.len())?;
        buf.as_mut().copy_from_slice(bytes);
        Ok(buf)
    }

    /// Logical length in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the logical length is zero
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocated capacity, always a multiple of [`ALIGNMENT`]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.layout.size()
    }

    /// Shrink the logical length, e.g. after a short read
    ///
    /// Lengths larger than the current one are ignored.
    pub fn truncate(&mut self, len: usize) {
        if len < self.len {
            self.len = len;
        }
    }

    /// Whether every visible byte is zero
    #[must_use]
    pub fn is_zeroed(&self) -> bool {
        is_all_zero(self)
    }

    /// Raw pointer to the start of the allocation
    #[must_use]
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    /// Mutable raw pointer to the start of the allocation
    #[must_use]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }
}

impl Drop for AlignedBuf {
    fn drop(&mut self) {
        // SAFETY: ptr was returned by alloc_zeroed with this exact layout
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) };
    }
}

impl Deref for AlignedBuf {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // SAFETY: len <= capacity and the whole allocation is initialised
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl DerefMut for AlignedBuf {
    fn deref_mut(&mut self) -> &mut [u8] {
        // SAFETY: len <= capacity, the allocation is initialised and uniquely owned
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl AsRef<[u8]> for AlignedBuf {
    fn as_ref(&self) -> &[u8] {
        self
    }
}

impl AsMut<[u8]> for AlignedBuf {
    fn as_mut(&mut self) -> &mut [u8] {
        self
    }
}

// SAFETY: the pointer stays valid until drop and the first `len` bytes are
// initialised (in fact the whole allocation is)
unsafe impl IoBuf for AlignedBuf {
    fn as_buf_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    fn buf_len(&self) -> usize {
        self.len
    }

    fn buf_capacity(&self) -> usize {
        self.layout.size()
    }
}

// SAFETY: the allocation is uniquely owned and `buf_capacity` bytes long
unsafe impl IoBufMut for AlignedBuf {
    fn as_buf_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }
}

impl SetBufInit for AlignedBuf {
    unsafe fn set_buf_init(&mut self, len: usize) {
        if len > self.len {
            self.len = len.min(self.layout.size());
        }
    }
}

impl std::fmt::Debug for AlignedBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedBuf")
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .finish()
    }
}

/// Whether every byte of `bytes` is zero
///
/// Compares word-sized blocks first, then the unaligned tail.
#[must_use]
pub fn is_all_zero(bytes: &[u8]) -> bool {
    // SAFETY: every bit pattern is a valid u64
    let (prefix, words, suffix) = unsafe { bytes.align_to::<u64>() };
    prefix.iter().all(|&b| b == 0)
        && words.iter().all(|&w| w == 0)
        && suffix.iter().all(|&b| b == 0)
}
