//! Synchronization primitives for NOS operating system
//!
//! This module provides thread-safe synchronization primitives
//! for use in a no_std environment.

pub use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
pub use spin::{Mutex, MutexGuard, Once};

/// Give the CPU away while spinning on a condition.
#[inline]
pub fn relax() {
    #[cfg(feature = "std")]
    std::thread::yield_now();
    #[cfg(not(feature = "std"))]
    core::hint::spin_loop();
}
