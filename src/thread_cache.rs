//! Thread cache (top tier): one instance per thread, no synchronization.
//!
//! Holds a per-size-class free list of blocks. The hot path (`allocate` on a
//! non-empty list, `deallocate` below the high-water mark) touches only this
//! thread's own memory and never locks or yields.

use crate::central_cache::CentralCache;
use crate::config::{HIGH_WATER_MARK, MAX_BATCH_BYTES, NUM_SIZE_CLASSES};
use crate::page_cache::PageCache;
use crate::span::FreeObject;
use crate::stats;
use crate::sync::SpinMutex;
use core::ptr;

/// Batch size heuristic for a refill of class `i`'s blocks (each `sz` bytes):
/// a step function of `sz` clamped so the total transfer stays near
/// `MAX_BATCH_BYTES`.
fn batch_size_for(sz: usize) -> usize {
    let base_num = match sz {
        s if s <= 32 => 64,
        s if s <= 64 => 32,
        s if s <= 128 => 16,
        s if s <= 256 => 8,
        s if s <= 512 => 4,
        s if s <= 1024 => 2,
        _ => 1,
    };
    base_num.min((MAX_BATCH_BYTES / sz).max(1)).max(1)
}

struct FreeList {
    head: *mut FreeObject,
    count: usize,
}

impl FreeList {
    const fn new() -> Self {
        Self {
            head: ptr::null_mut(),
            count: 0,
        }
    }
}

/// Per-thread state: one free list per size class, never shared.
pub struct ThreadCache {
    lists: [FreeList; NUM_SIZE_CLASSES],
}

impl ThreadCache {
    pub const fn new() -> Self {
        Self {
            lists: [const { FreeList::new() }; NUM_SIZE_CLASSES],
        }
    }

    /// Allocate one block of class `i`.
    ///
    /// # Safety
    ///
    /// `i` must be `< NUM_SIZE_CLASSES`.
    pub unsafe fn allocate(
        &mut self,
        i: usize,
        central: &CentralCache,
        page_cache: &SpinMutex<PageCache>,
    ) -> *mut u8 {
        let list = &mut self.lists[i];
        if !list.head.is_null() {
            let block = list.head;
            unsafe {
                list.head = (*block).next;
            }
            list.count -= 1;
            stats::record_thread_cache_hit();
            return block as *mut u8;
        }

        stats::record_thread_cache_miss();
        unsafe { self.fetch_from_central(i, central, page_cache) }
    }

    /// Return one block of class `i` to this thread's list, spilling half
    /// the list back to the central cache if it now exceeds the high-water
    /// mark.
    ///
    /// # Safety
    ///
    /// `ptr` must be a block of class `i` not currently on any free list.
    pub unsafe fn deallocate(
        &mut self,
        ptr: *mut u8,
        i: usize,
        central: &CentralCache,
        page_cache: &SpinMutex<PageCache>,
    ) {
        let list = &mut self.lists[i];
        let node = ptr as *mut FreeObject;
        unsafe {
            (*node).next = list.head;
        }
        list.head = node;
        list.count += 1;

        if list.count > HIGH_WATER_MARK {
            unsafe { self.return_to_central(i, central, page_cache) };
        }
    }

    unsafe fn fetch_from_central(
        &mut self,
        i: usize,
        central: &CentralCache,
        page_cache: &SpinMutex<PageCache>,
    ) -> *mut u8 {
        let sz = crate::size_class::class_to_size(i);
        let b = batch_size_for(sz);

        let (count, head) = unsafe { central.fetch_range(i, b, page_cache) };
        if head.is_null() {
            return ptr::null_mut();
        }
        stats::record_central_cache_hit();

        let result = head;
        let list = &mut self.lists[i];
        unsafe {
            list.head = (*result).next;
        }
        list.count = count - 1;

        result as *mut u8
    }

    unsafe fn return_to_central(
        &mut self,
        i: usize,
        central: &CentralCache,
        page_cache: &SpinMutex<PageCache>,
    ) {
        let _ = page_cache;
        let list = &mut self.lists[i];
        let half = list.count / 2;
        if half == 0 {
            return;
        }

        let spill_head = list.head;
        let mut tail = spill_head;
        unsafe {
            for _ in 1..half {
                tail = (*tail).next;
            }
            let remainder = (*tail).next;
            (*tail).next = ptr::null_mut();
            list.head = remainder;
        }
        list.count -= half;

        unsafe { central.return_range(i, spill_head) };
    }
}

impl Default for ThreadCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::size_class::size_to_class;

    #[test]
    fn allocate_then_deallocate_then_allocate_is_lifo() {
        // S1: alloc, free, alloc again returns the same address.
        let pc = SpinMutex::new(PageCache::new());
        let cc = CentralCache::new();
        let mut tc = ThreadCache::new();
        let class = size_to_class(12);

        unsafe {
            let a = tc.allocate(class, &cc, &pc);
            assert!(!a.is_null());
            tc.deallocate(a, class, &cc, &pc);
            let b = tc.allocate(class, &cc, &pc);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn spills_past_the_high_water_mark() {
        // S2 (scaled down): push enough blocks onto one class's list to
        // cross the high-water mark repeatedly and confirm the in-thread
        // count never grows without bound.
        let pc = SpinMutex::new(PageCache::new());
        let cc = CentralCache::new();
        let mut tc = ThreadCache::new();
        let class = size_to_class(32);

        let mut ptrs = alloc::vec::Vec::new();
        unsafe {
            for _ in 0..500 {
                let p = tc.allocate(class, &cc, &pc);
                assert!(!p.is_null());
                ptrs.push(p);
            }
            for p in ptrs {
                tc.deallocate(p, class, &cc, &pc);
            }
            assert!(tc.lists[class].count <= HIGH_WATER_MARK + 1);
        }
    }

    #[test]
    fn batch_heuristic_stays_within_bounds() {
        assert_eq!(batch_size_for(8), 64.min(4096 / 8));
        assert_eq!(batch_size_for(1025), 1);
        assert!(batch_size_for(MAX_BATCH_BYTES * 2) >= 1);
    }
}
