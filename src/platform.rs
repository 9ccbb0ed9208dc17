//! OS platform abstraction.
//!
//! Two primitives only: `page_mmap` acquires zero-filled, page-aligned
//! anonymous memory for the page cache (never returned to the OS — see
//! the page cache's ownership model); `system_alloc`/`system_dealloc` hand
//! oversize requests straight to the platform's general-purpose allocator,
//! bypassing all three tiers.

#[cfg(all(unix, not(miri)))]
mod imp {
    use core::ffi::c_void;

    const PROT_READ: i32 = 0x1;
    const PROT_WRITE: i32 = 0x2;
    const MAP_PRIVATE: i32 = 0x02;
    const MAP_ANONYMOUS: i32 = 0x20;
    const MAP_FAILED: *mut c_void = !0 as *mut c_void;

    unsafe extern "C" {
        fn mmap(
            addr: *mut c_void,
            len: usize,
            prot: i32,
            flags: i32,
            fd: i32,
            offset: i64,
        ) -> *mut c_void;
    }

    pub unsafe fn page_mmap(size: usize) -> *mut u8 {
        let ptr = unsafe {
            mmap(
                core::ptr::null_mut(),
                size,
                PROT_READ | PROT_WRITE,
                MAP_PRIVATE | MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if ptr == MAP_FAILED {
            core::ptr::null_mut()
        } else {
            ptr as *mut u8
        }
    }
}

#[cfg(windows)]
mod imp {
    use core::ffi::c_void;

    const MEM_COMMIT: u32 = 0x1000;
    const MEM_RESERVE: u32 = 0x2000;
    const PAGE_READWRITE: u32 = 0x04;

    unsafe extern "system" {
        #[link_name = "VirtualAlloc"]
        fn virtual_alloc(
            lp_address: *mut c_void,
            dw_size: usize,
            fl_allocation_type: u32,
            fl_protect: u32,
        ) -> *mut c_void;
    }

    pub unsafe fn page_mmap(size: usize) -> *mut u8 {
        let ptr = unsafe {
            virtual_alloc(
                core::ptr::null_mut(),
                size,
                MEM_COMMIT | MEM_RESERVE,
                PAGE_READWRITE,
            )
        };
        ptr as *mut u8
    }
}

/// Miri can't execute real mmap/VirtualAlloc syscalls, so fall back to the
/// system allocator to let Miri check the unsafe pointer logic elsewhere.
#[cfg(miri)]
mod imp {
    extern crate alloc;
    use core::alloc::Layout;

    pub unsafe fn page_mmap(size: usize) -> *mut u8 {
        let layout = Layout::from_size_align(size, crate::config::PAGE_SIZE).unwrap();
        unsafe { alloc::alloc::alloc_zeroed(layout) }
    }
}

/// Acquire `n_pages * PAGE_SIZE` bytes of read/write, private, zero-initialized
/// anonymous memory, page-aligned. Returns null on failure.
///
/// Pages obtained this way are never returned to the OS; the page cache holds
/// them until process exit (see `page_cache`).
#[inline]
pub unsafe fn page_mmap(n_pages: usize) -> *mut u8 {
    unsafe { imp::page_mmap(n_pages * crate::config::PAGE_SIZE) }
}

unsafe extern "C" {
    fn malloc(size: usize) -> *mut u8;
    fn free(ptr: *mut u8);
}

/// Delegate an oversize allocation to the system's generic allocator.
#[inline]
pub unsafe fn system_alloc(size: usize) -> *mut u8 {
    unsafe { malloc(size) }
}

/// Delegate an oversize deallocation to the system's generic allocator.
///
/// `size` is accepted for symmetry with the rest of the size-tracking API
/// but is not required by `free`.
#[inline]
pub unsafe fn system_dealloc(ptr: *mut u8, _size: usize) {
    unsafe { free(ptr) };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PAGE_SIZE;

    #[test]
    fn test_page_mmap_zeroed_and_writable() {
        unsafe {
            let ptr = page_mmap(1);
            assert!(!ptr.is_null());
            for i in 0..PAGE_SIZE {
                assert_eq!(*ptr.add(i), 0);
            }
            for i in 0..PAGE_SIZE {
                *ptr.add(i) = (i & 0xFF) as u8;
            }
            for i in 0..PAGE_SIZE {
                assert_eq!(*ptr.add(i), (i & 0xFF) as u8);
            }
        }
    }

    #[test]
    fn test_page_mmap_multiple_pages() {
        unsafe {
            let ptr = page_mmap(8);
            assert!(!ptr.is_null());
            *ptr = 0xAA;
            *ptr.add(8 * PAGE_SIZE - 1) = 0xBB;
            assert_eq!(*ptr, 0xAA);
            assert_eq!(*ptr.add(8 * PAGE_SIZE - 1), 0xBB);
        }
    }

    #[test]
    fn test_system_alloc_round_trip() {
        unsafe {
            let ptr = system_alloc(300_000);
            assert!(!ptr.is_null());
            *ptr = 7;
            *ptr.add(299_999) = 9;
            assert_eq!(*ptr, 7);
            system_dealloc(ptr, 300_000);
        }
    }
}
