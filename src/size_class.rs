//! Size-class math.
//!
//! Unlike a tiered table keyed by inspection (small jumps at 8 bytes, larger
//! jumps further out), this allocator uses one uniform quantum: class `i`
//! always holds blocks of exactly `(i + 1) * ALIGNMENT` bytes, for
//! `i` in `0..NUM_SIZE_CLASSES`. Classification is arithmetic, not a table
//! lookup.

use crate::config::{ALIGNMENT, MAX_BYTES, NUM_SIZE_CLASSES};

/// Round `size` up to the next multiple of `ALIGNMENT` (minimum `ALIGNMENT`).
#[inline]
pub const fn round_up(size: usize) -> usize {
    let size = if size == 0 { 1 } else { size };
    (size + ALIGNMENT - 1) & !(ALIGNMENT - 1)
}

/// Map a requested byte count to a size class index.
///
/// # Panics
///
/// Panics (in debug builds via the caller's own check) if `size > MAX_BYTES`;
/// callers are expected to route oversize requests to the large-object
/// bypass before calling this.
#[inline]
pub const fn size_to_class(size: usize) -> usize {
    debug_assert!(size <= MAX_BYTES);
    round_up(size) / ALIGNMENT - 1
}

/// Map a size class index back to its block size in bytes.
#[inline]
pub const fn class_to_size(class: usize) -> usize {
    debug_assert!(class < NUM_SIZE_CLASSES);
    (class + 1) * ALIGNMENT
}
