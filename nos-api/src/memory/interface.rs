//! Address space interface
//!
//! A process owns at most one address space. Destroying it is `Drop`.

use alloc::boxed::Box;

use crate::core::types::VirtAddr;
use crate::error::Result;

/// A user address space.
pub trait AddressSpace: Send {
    /// Deep-copy this address space for a forked child.
    fn copy(&self) -> Result<Box<dyn AddressSpace>>;

    /// Make this the address space the MMU translates through.
    fn activate(&self);

    /// Stop translating through this address space.
    fn deactivate(&self);

    /// Set up the user stack region and return the initial stack pointer
    /// (one past the highest usable byte).
    fn define_stack(&mut self) -> Result<VirtAddr>;

    /// Check that every byte of `[addr, addr + len)` is mapped, and
    /// writable when `write` is set. Returns `Fault` otherwise.
    fn check_range(&self, addr: VirtAddr, len: usize, write: bool) -> Result<()>;

    /// Copy `dst.len()` bytes from user address `src`.
    ///
    /// Returns `Fault` if any byte of the range is not mapped.
    fn copyin(&self, src: VirtAddr, dst: &mut [u8]) -> Result<()>;

    /// Copy `src` to user address `dst`.
    ///
    /// Returns `Fault` if any byte of the range is not mapped.
    fn copyout(&mut self, src: &[u8], dst: VirtAddr) -> Result<()>;
}

/// Creates empty address spaces for exec.
pub trait AddressSpaceFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn AddressSpace>>;
}
