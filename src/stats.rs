//! Allocation statistics counters.
//!
//! All counters use `Relaxed` ordering — they are observational only and not
//! used as synchronization primitives. The allocator's own spinlocks provide
//! the ordering guarantees for correctness; these counters are purely for
//! monitoring. Recording compiles to nothing when the `stats` feature is
//! disabled.
//!
//! # Usage
//!
//! ```ignore
//! let snap = tiermalloc::stats::snapshot();
//! println!("allocs: {}", snap.alloc_count);
//! ```

use core::sync::atomic::{AtomicU64, Ordering};

struct Stats {
    alloc_count: AtomicU64,
    dealloc_count: AtomicU64,
    alloc_bytes: AtomicU64,
    thread_cache_hits: AtomicU64,
    thread_cache_misses: AtomicU64,
    central_cache_hits: AtomicU64,
    large_bypass_count: AtomicU64,
    os_alloc_count: AtomicU64,
    os_alloc_pages: AtomicU64,
    span_splits: AtomicU64,
    span_coalesces: AtomicU64,
}

impl Stats {
    const fn new() -> Self {
        Self {
            alloc_count: AtomicU64::new(0),
            dealloc_count: AtomicU64::new(0),
            alloc_bytes: AtomicU64::new(0),
            thread_cache_hits: AtomicU64::new(0),
            thread_cache_misses: AtomicU64::new(0),
            central_cache_hits: AtomicU64::new(0),
            large_bypass_count: AtomicU64::new(0),
            os_alloc_count: AtomicU64::new(0),
            os_alloc_pages: AtomicU64::new(0),
            span_splits: AtomicU64::new(0),
            span_coalesces: AtomicU64::new(0),
        }
    }
}

static STATS: Stats = Stats::new();

/// A point-in-time snapshot of all allocation statistics.
///
/// Fields are plain `u64` values loaded from the global atomic counters.
/// Individual fields are each atomically read, but the snapshot as a whole
/// is not globally consistent — concurrent allocations may race between
/// loads. For monitoring purposes this is always sufficient.
#[derive(Clone, Copy, Debug, Default)]
pub struct Snapshot {
    pub alloc_count: u64,
    pub dealloc_count: u64,
    pub alloc_bytes: u64,
    pub thread_cache_hits: u64,
    pub thread_cache_misses: u64,
    pub central_cache_hits: u64,
    pub large_bypass_count: u64,
    pub os_alloc_count: u64,
    pub os_alloc_pages: u64,
    pub span_splits: u64,
    pub span_coalesces: u64,
}

/// Load all counters with `Relaxed` ordering and return a [`Snapshot`].
pub fn snapshot() -> Snapshot {
    let s = &STATS;
    Snapshot {
        alloc_count: s.alloc_count.load(Ordering::Relaxed),
        dealloc_count: s.dealloc_count.load(Ordering::Relaxed),
        alloc_bytes: s.alloc_bytes.load(Ordering::Relaxed),
        thread_cache_hits: s.thread_cache_hits.load(Ordering::Relaxed),
        thread_cache_misses: s.thread_cache_misses.load(Ordering::Relaxed),
        central_cache_hits: s.central_cache_hits.load(Ordering::Relaxed),
        large_bypass_count: s.large_bypass_count.load(Ordering::Relaxed),
        os_alloc_count: s.os_alloc_count.load(Ordering::Relaxed),
        os_alloc_pages: s.os_alloc_pages.load(Ordering::Relaxed),
        span_splits: s.span_splits.load(Ordering::Relaxed),
        span_coalesces: s.span_coalesces.load(Ordering::Relaxed),
    }
}

#[inline]
pub(crate) fn record_alloc(size: usize) {
    STATS.alloc_count.fetch_add(1, Ordering::Relaxed);
    STATS.alloc_bytes.fetch_add(size as u64, Ordering::Relaxed);
}

#[inline]
pub(crate) fn record_dealloc() {
    STATS.dealloc_count.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub(crate) fn record_thread_cache_hit() {
    #[cfg(feature = "stats")]
    STATS.thread_cache_hits.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub(crate) fn record_thread_cache_miss() {
    #[cfg(feature = "stats")]
    STATS.thread_cache_misses.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub(crate) fn record_central_cache_hit() {
    #[cfg(feature = "stats")]
    STATS.central_cache_hits.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub(crate) fn record_large_bypass() {
    #[cfg(feature = "stats")]
    STATS.large_bypass_count.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub(crate) fn record_os_alloc(n_pages: usize) {
    STATS.os_alloc_count.fetch_add(1, Ordering::Relaxed);
    STATS
        .os_alloc_pages
        .fetch_add(n_pages as u64, Ordering::Relaxed);
}

#[inline]
pub(crate) fn record_span_split() {
    STATS.span_splits.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub(crate) fn record_span_coalesce() {
    STATS.span_coalesces.fetch_add(1, Ordering::Relaxed);
}
