//! Page cache (bottom tier): owns all OS-backed memory.
//!
//! Tracks contiguous page runs ("spans"), splits larger free spans to
//! satisfy smaller requests, and coalesces forward on release. All state is
//! mutated under a single process-wide lock (the enclosing `SpinMutex`).

use crate::platform;
use crate::span::{self, Span, SpanList};
use crate::stats;
use alloc::collections::BTreeMap;
use core::ptr;

/// The page cache.
///
/// - `free_spans` maps page count -> list of free spans with exactly that
///   many pages. Keyed by page count so the smallest fit >= n can be found
///   with a single range lookup.
/// - `span_index` maps base address -> span descriptor, for every span the
///   page cache has ever carved (free or in use). Used to locate the
///   forward neighbor on release and to validate deallocate_span calls.
pub struct PageCache {
    free_spans: BTreeMap<usize, SpanList>,
    span_index: BTreeMap<usize, *mut Span>,
}

// SAFETY: PageCache is only accessed through the enclosing SpinMutex. Its
// raw pointers reference OS-backed memory that outlives any single thread.
unsafe impl Send for PageCache {}

impl PageCache {
    pub const fn new() -> Self {
        Self {
            free_spans: BTreeMap::new(),
            span_index: BTreeMap::new(),
        }
    }

    /// Allocate a span of at least `n` pages. Returns the span's base
    /// address, or null on OS failure.
    ///
    /// # Safety
    ///
    /// Caller must hold exclusive access (via the enclosing `SpinMutex`).
    pub unsafe fn allocate_span(&mut self, n: usize) -> *mut u8 {
        debug_assert!(n > 0);

        // Smallest free span with page count >= n.
        if let Some((&key, _)) = self.free_spans.range(n..).next() {
            let list = self.free_spans.get_mut(&key).unwrap();
            let s = unsafe { list.pop() };
            if list.is_empty() {
                self.free_spans.remove(&key);
            }

            unsafe {
                (*s).free = false;
            }

            if key > n {
                let remainder_pages = key - n;
                let remainder_start = unsafe { (*s).start_page } + n;
                unsafe {
                    (*s).num_pages = n;
                }

                let r = span::alloc_span();
                if r.is_null() {
                    // Can't record the split; put S back whole rather than leak it.
                    unsafe {
                        (*s).num_pages = key;
                        (*s).free = true;
                    }
                    self.free_spans.entry(key).or_default();
                    unsafe { self.free_spans.get_mut(&key).unwrap().push(s) };
                    return ptr::null_mut();
                }
                unsafe {
                    (*r).start_page = remainder_start;
                    (*r).num_pages = remainder_pages;
                    (*r).free = true;
                }
                let r_base = unsafe { (*r).start_addr() } as usize;
                self.span_index.insert(r_base, r);
                self.free_spans.entry(remainder_pages).or_default();
                unsafe {
                    self.free_spans.get_mut(&remainder_pages).unwrap().push(r);
                }

                stats::record_span_split();
            }

            let base = unsafe { (*s).start_addr() } as usize;
            self.span_index.insert(base, s);
            return base as *mut u8;
        }

        // Nothing free fits; request exactly n fresh pages from the OS.
        let base = unsafe { platform::page_mmap(n) };
        if base.is_null() {
            return ptr::null_mut();
        }
        stats::record_os_alloc(n);

        let s = span::alloc_span();
        if s.is_null() {
            // Span metadata exhausted; leak the OS mapping rather than hand
            // back unmanaged memory (never happens once the slab can grow).
            return ptr::null_mut();
        }
        unsafe {
            (*s).start_page = base as usize >> crate::config::PAGE_SHIFT;
            (*s).num_pages = n;
            (*s).free = false;
        }
        self.span_index.insert(base as usize, s);
        base
    }

    /// Release a span of `n` pages starting at `base` back to the page
    /// cache, coalescing forward with an immediately following free span.
    ///
    /// # Safety
    ///
    /// Caller must hold exclusive access. `base`/`n` must match a span
    /// previously returned by `allocate_span` and not yet deallocated.
    pub unsafe fn deallocate_span(&mut self, base: *mut u8, n: usize) {
        let base_addr = base as usize;
        let s = *self
            .span_index
            .get(&base_addr)
            .expect("deallocate_span: unknown span base");
        debug_assert_eq!(unsafe { (*s).num_pages }, n);

        unsafe {
            (*s).free = true;
        }

        let neighbor_addr = base_addr + n * crate::config::PAGE_SIZE;
        if let Some(&t) = self.span_index.get(&neighbor_addr) {
            if unsafe { (*t).free } {
                let t_pages = unsafe { (*t).num_pages };
                let list = self.free_spans.get_mut(&t_pages).unwrap();
                unsafe { list.remove(t) };
                if list.is_empty() {
                    self.free_spans.remove(&t_pages);
                }
                self.span_index.remove(&neighbor_addr);
                unsafe {
                    span::dealloc_span(t);
                    (*s).num_pages += t_pages;
                }
                stats::record_span_coalesce();
            }
        }

        let final_pages = unsafe { (*s).num_pages };
        self.free_spans.entry(final_pages).or_default();
        unsafe {
            self.free_spans.get_mut(&final_pages).unwrap().push(s);
        }
    }

    /// Number of distinct spans the page cache currently has allocated
    /// (free or in use). Exposed for tests.
    #[cfg(test)]
    fn span_count(&self) -> usize {
        self.span_index.len()
    }

    /// Whether `base` is currently tracked in `span_index`. Exposed for
    /// tests exercising the large-object bypass (P5/S4: bypassed addresses
    /// must never appear here).
    #[cfg(test)]
    pub fn contains(&self, base: *mut u8) -> bool {
        self.span_index.contains_key(&(base as usize))
    }
}

impl Default for PageCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PAGE_SIZE;

    #[test]
    fn allocate_then_deallocate_round_trips() {
        let mut pc = PageCache::new();
        unsafe {
            let base = pc.allocate_span(4);
            assert!(!base.is_null());
            assert!(pc.contains(base));
            pc.deallocate_span(base, 4);
        }
    }

    #[test]
    fn split_serves_remainder_without_new_os_call() {
        // S5 (deterministic variant): seed an 8-page free span, then split
        // it with two smaller requests and confirm the second is served
        // from the remainder, not a fresh OS call.
        let mut pc = PageCache::new();
        unsafe {
            let base = pc.allocate_span(8);
            assert!(!base.is_null());
            pc.deallocate_span(base, 8);

            let before = stats::snapshot().os_alloc_count;
            let a = pc.allocate_span(1);
            assert!(!a.is_null());
            let after_first = stats::snapshot().os_alloc_count;
            assert_eq!(after_first, before, "first split must not hit the OS");

            let b = pc.allocate_span(7);
            assert!(!b.is_null());
            let after_second = stats::snapshot().os_alloc_count;
            assert_eq!(
                after_second, before,
                "remainder must satisfy the second request without a new OS call"
            );
            assert_eq!(b as usize, a as usize + PAGE_SIZE);

            pc.deallocate_span(a, 1);
            pc.deallocate_span(b, 7);
        }
    }

    #[test]
    fn forward_coalescing_reunites_split_spans() {
        // S6: two adjacent spans carved from one fresh page run; freeing
        // the second then the first must coalesce back into one span that
        // satisfies the combined request without a new OS call.
        let mut pc = PageCache::new();
        unsafe {
            let seed = pc.allocate_span(8);
            pc.deallocate_span(seed, 8);

            let s1 = pc.allocate_span(4);
            let s2 = pc.allocate_span(4);
            assert_eq!(s2 as usize, s1 as usize + 4 * PAGE_SIZE);

            let before = stats::snapshot().os_alloc_count;
            pc.deallocate_span(s2, 4);
            pc.deallocate_span(s1, 4);

            let merged = pc.allocate_span(8);
            assert_eq!(merged, s1);
            assert_eq!(stats::snapshot().os_alloc_count, before);

            pc.deallocate_span(merged, 8);
        }
    }

    #[test]
    fn free_span_index_has_no_adjacent_pair_after_coalesce() {
        // I5: no two adjacent spans both appear free after a release that
        // should have coalesced them.
        let mut pc = PageCache::new();
        unsafe {
            let seed = pc.allocate_span(8);
            pc.deallocate_span(seed, 8);
            let s1 = pc.allocate_span(4);
            let s2 = pc.allocate_span(4);
            pc.deallocate_span(s2, 4);
            pc.deallocate_span(s1, 4);

            assert_eq!(pc.span_count(), 1);
        }
    }

    #[test]
    fn ascending_release_order_misses_the_coalesce() {
        // Forward coalescing only checks the successor of the span being
        // released. Freeing the predecessor first (while the successor is
        // still in use) means the merge opportunity never reappears once
        // the successor is freed later, since that release checks *its*
        // successor, not its predecessor. This is the documented backward-
        // coalescing omission, not a bug.
        let mut pc = PageCache::new();
        unsafe {
            let seed = pc.allocate_span(8);
            pc.deallocate_span(seed, 8);
            let s1 = pc.allocate_span(4);
            let s2 = pc.allocate_span(4);

            pc.deallocate_span(s1, 4);
            pc.deallocate_span(s2, 4);

            assert_eq!(pc.span_count(), 2);
        }
    }
}
