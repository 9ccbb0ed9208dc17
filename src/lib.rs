#![no_std]

//! tiermalloc: a thread-aware, three-tier dynamic memory allocator.
//!
//! Allocation requests flow top-down through three tiers:
//! - [`thread_cache`] — one lock-free instance per thread (fast path)
//! - [`central_cache`] — process-wide, per-size-class spinlocks
//! - [`page_cache`] — process-wide, single lock, owns all OS-backed memory
//!
//! Requests above [`config::MAX_BYTES`] bypass all three tiers and go
//! straight to the system allocator.
//!
//! # Usage
//!
//! ```ignore
//! #[global_allocator]
//! static GLOBAL: tiermalloc::TierMalloc = tiermalloc::TierMalloc;
//! ```

extern crate alloc;
#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod allocator;
pub mod central_cache;
pub mod config;
pub mod page_cache;
pub mod platform;
pub mod size_class;
pub mod span;
pub mod stats;
pub mod sync;
#[cfg(feature = "std")]
pub mod thread_cache;

pub use allocator::{allocate, deallocate, TierMalloc};
pub use config::PAGE_SIZE;
