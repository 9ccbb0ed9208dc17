//! Top-level allocator: ties all three tiers together and implements the
//! facade and `GlobalAlloc`.
//!
//! Static state lives here. `TierMalloc` is zero-sized; all mutable state is
//! in module-level statics protected by spinlocks, plus one `ThreadCache`
//! per thread behind `std::thread_local!` when the `std` feature is
//! enabled. Without `std`, there is no thread-local cache: every request
//! goes straight to the central cache, which is still correct, just not
//! lock-free on the hot path.

use crate::central_cache::CentralCache;
use crate::config::MAX_BYTES;
use crate::page_cache::PageCache;
use crate::platform;
use crate::size_class;
use crate::stats;
use crate::sync::SpinMutex;
use core::alloc::{GlobalAlloc, Layout};
use core::ptr;

static PAGE_CACHE: SpinMutex<PageCache> = SpinMutex::new(PageCache::new());
static CENTRAL_CACHE: CentralCache = CentralCache::new();

cfg_if::cfg_if! {
    if #[cfg(feature = "std")] {
        use crate::thread_cache::ThreadCache;
        use core::cell::UnsafeCell;

        std::thread_local! {
            static THREAD_CACHE: UnsafeCell<ThreadCache> = const { UnsafeCell::new(ThreadCache::new()) };
        }

        #[inline]
        unsafe fn small_allocate(class: usize) -> *mut u8 {
            THREAD_CACHE.with(|cell| {
                let tc = unsafe { &mut *cell.get() };
                unsafe { tc.allocate(class, &CENTRAL_CACHE, &PAGE_CACHE) }
            })
        }

        #[inline]
        unsafe fn small_deallocate(ptr: *mut u8, class: usize) {
            THREAD_CACHE.with(|cell| {
                let tc = unsafe { &mut *cell.get() };
                unsafe { tc.deallocate(ptr, class, &CENTRAL_CACHE, &PAGE_CACHE) };
            })
        }
    } else {
        // No thread-local storage available: bypass the thread cache and
        // go straight to the central cache on every request. Still correct
        // (every operation still holds the class's spinlock), just not
        // lock-free on the hot path.
        #[inline]
        unsafe fn small_allocate(class: usize) -> *mut u8 {
            // No thread cache to hold a batch, so fetch one block at a time.
            let (_count, head) = unsafe { CENTRAL_CACHE.fetch_range(class, 1, &PAGE_CACHE) };
            head as *mut u8
        }

        #[inline]
        unsafe fn small_deallocate(ptr: *mut u8, class: usize) {
            let node = ptr as *mut crate::span::FreeObject;
            unsafe { (*node).next = ptr::null_mut() };
            unsafe { CENTRAL_CACHE.return_range(class, node) };
        }
    }
}

/// Allocate `size` bytes. Returns null on failure or when `size == 0`.
///
/// Requests over `MAX_BYTES` bypass all three tiers and go straight to the
/// system allocator.
pub fn allocate(size: usize) -> *mut u8 {
    if size == 0 {
        return ptr::null_mut();
    }
    stats::record_alloc(size);

    if size > MAX_BYTES {
        stats::record_large_bypass();
        return unsafe { platform::system_alloc(size) };
    }

    let class = size_class::size_to_class(size);
    unsafe { small_allocate(class) }
}

/// Deallocate `addr`, which must have been returned by [`allocate`] with
/// this same `size`. `addr == null` is ignored.
pub fn deallocate(addr: *mut u8, size: usize) {
    if addr.is_null() || size == 0 {
        return;
    }
    stats::record_dealloc();

    if size > MAX_BYTES {
        unsafe { platform::system_dealloc(addr, size) };
        return;
    }

    let class = size_class::size_to_class(size);
    unsafe { small_deallocate(addr, class) };
}

/// Zero-sized handle implementing [`GlobalAlloc`] in terms of [`allocate`]
/// and [`deallocate`].
///
/// The design's Non-goals exclude alignment support beyond the base
/// quantum (8 bytes); requests needing a stronger alignment than that are
/// routed to the system allocator, which honors `Layout::align` directly.
pub struct TierMalloc;

unsafe impl GlobalAlloc for TierMalloc {
    #[inline]
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let size = layout.size();
        if size == 0 {
            return layout.align() as *mut u8;
        }
        if layout.align() > crate::config::ALIGNMENT || size > MAX_BYTES {
            stats::record_alloc(size);
            stats::record_large_bypass();
            return unsafe { platform::system_alloc(size) };
        }
        allocate(size)
    }

    #[inline]
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        let size = layout.size();
        if size == 0 {
            return;
        }
        if layout.align() > crate::config::ALIGNMENT || size > MAX_BYTES {
            stats::record_dealloc();
            unsafe { platform::system_dealloc(ptr, size) };
            return;
        }
        deallocate(ptr, size);
    }

    // `alloc_zeroed` and `realloc` use the trait's default implementations:
    // both operate purely in terms of `Layout` sizes passed by the caller,
    // which matches this allocator's size-tracking (not size-recording)
    // contract — there is no per-block size to look up internally.
}
