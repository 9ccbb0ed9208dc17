//! Central cache (middle tier): process-wide, per-size-class free lists.
//!
//! Each size class has its own list and its own spinlock; an operation on
//! class `i` never contends with an operation on class `j != i`. On an empty
//! list, the central cache carves a fresh span fetched from the page cache
//! into a chain of same-sized blocks.
//!
//! The repository this design is drawn from has two `fetchRange` variants:
//! one that hands back a single block and spills the remainder via a
//! separate call, and one that takes a batch size and returns a whole chain.
//! This implementation is the batched variant, matching the thread cache's
//! refill contract — the single-block variant is not used here.

use crate::config::{ALIGNMENT, NUM_SIZE_CLASSES, PAGE_SIZE, SPAN_PAGES};
use crate::page_cache::PageCache;
use crate::span::FreeObject;
use crate::sync::SpinMutex;
use core::ptr;

/// One size class's free list head. Not `Send` by default because of the
/// raw pointer; the enclosing `SpinMutex` provides the exclusion that makes
/// sharing it across threads sound.
struct CentralList {
    head: *mut FreeObject,
}

unsafe impl Send for CentralList {}

impl CentralList {
    const fn new() -> Self {
        Self {
            head: ptr::null_mut(),
        }
    }
}

pub struct CentralCache {
    lists: [SpinMutex<CentralList>; NUM_SIZE_CLASSES],
}

impl CentralCache {
    pub const fn new() -> Self {
        Self {
            lists: [const { SpinMutex::new(CentralList::new()) }; NUM_SIZE_CLASSES],
        }
    }

    /// Fetch a chain of up to `batch` blocks of class `i`.
    ///
    /// Returns `(count, head)`; `head` is null and `count` is 0 if no span
    /// could be obtained from the page cache.
    ///
    /// # Safety
    ///
    /// `i` must be `< NUM_SIZE_CLASSES`. `page_cache` must be the shared
    /// page cache this central cache was built against.
    pub unsafe fn fetch_range(
        &self,
        i: usize,
        batch: usize,
        page_cache: &SpinMutex<PageCache>,
    ) -> (usize, *mut FreeObject) {
        debug_assert!(i < NUM_SIZE_CLASSES);
        if batch == 0 {
            return (0, ptr::null_mut());
        }

        let mut guard = self.lists[i].lock();

        if guard.head.is_null() {
            let carved = unsafe { Self::carve_span_for(i, page_cache) };
            if carved.is_null() {
                return (0, ptr::null_mut());
            }
            guard.head = carved;
        }

        // Walk at most batch-1 steps to isolate a prefix of <= batch blocks.
        let head = guard.head;
        let mut tail = head;
        let mut count = 1;
        unsafe {
            while count < batch && !(*tail).next.is_null() {
                tail = (*tail).next;
                count += 1;
            }
            let remainder = (*tail).next;
            (*tail).next = ptr::null_mut();
            guard.head = remainder;
        }

        (count, head)
    }

    /// Return a well-formed chain of class-`i` blocks to the central list.
    ///
    /// # Safety
    ///
    /// `start` must head a chain of blocks all belonging to class `i`,
    /// terminated by a null `next`.
    pub unsafe fn return_range(&self, i: usize, start: *mut FreeObject) {
        debug_assert!(i < NUM_SIZE_CLASSES);
        if start.is_null() {
            return;
        }

        let mut guard = self.lists[i].lock();

        let mut tail = start;
        unsafe {
            while !(*tail).next.is_null() {
                tail = (*tail).next;
            }
            (*tail).next = guard.head;
        }
        guard.head = start;
    }

    /// Acquire a span from the page cache and carve it into a chain of
    /// class-`i` blocks. Called with the class lock already held.
    unsafe fn carve_span_for(i: usize, page_cache: &SpinMutex<PageCache>) -> *mut FreeObject {
        let sz = (i + 1) * ALIGNMENT;

        let pages = if sz <= SPAN_PAGES * PAGE_SIZE {
            SPAN_PAGES
        } else {
            sz.div_ceil(PAGE_SIZE).max(1)
        };

        let base = unsafe { page_cache.lock().allocate_span(pages) };
        if base.is_null() {
            return ptr::null_mut();
        }

        let span_bytes = pages * PAGE_SIZE;
        let mut current = base;
        let end = unsafe { base.add(span_bytes) };

        let head = current as *mut FreeObject;
        let mut tail = head;
        current = unsafe { current.add(sz) };

        while unsafe { current.add(sz) } <= end {
            let node = current as *mut FreeObject;
            unsafe {
                (*tail).next = node;
            }
            tail = node;
            current = unsafe { current.add(sz) };
        }
        unsafe {
            (*tail).next = ptr::null_mut();
        }

        head
    }
}

impl Default for CentralCache {
    fn default() -> Self {
        Self::new()
    }
}
