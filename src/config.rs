//! Compile-time tuning constants.
//!
//! These mirror the fixed table the allocator is built against. None of them
//! are read from the environment or a build script; changing the allocator's
//! behavior means changing these values and rebuilding.

/// Size-class quantum: every small-object size is rounded up to a multiple
/// of this many bytes.
pub const ALIGNMENT: usize = 8;

/// Small-object ceiling. Requests larger than this bypass all three tiers
/// and go straight to the system allocator.
pub const MAX_BYTES: usize = 262_144;

/// Number of size classes, `MAX_BYTES / ALIGNMENT`. Class `i` holds blocks
/// of `(i + 1) * ALIGNMENT` bytes.
pub const NUM_SIZE_CLASSES: usize = MAX_BYTES / ALIGNMENT;

/// OS page granularity the page cache allocates in.
pub const PAGE_SIZE: usize = 4096;

/// `PAGE_SIZE` as a shift amount, for address/page-id conversions.
pub const PAGE_SHIFT: u32 = PAGE_SIZE.trailing_zeros();

/// Default page count requested for a span that will be carved into blocks
/// no larger than `SPAN_PAGES * PAGE_SIZE`.
pub const SPAN_PAGES: usize = 8;

/// ThreadCache list length that triggers a spill back to the central cache.
pub const HIGH_WATER_MARK: usize = 20;

/// Target ceiling, in bytes, for a single thread-cache refill batch.
pub const MAX_BATCH_BYTES: usize = 4096;
