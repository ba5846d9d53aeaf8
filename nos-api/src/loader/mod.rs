//! Program loader interface

use crate::core::types::VirtAddr;
use crate::error::Result;
use crate::memory::AddressSpace;
use crate::vfs::Vnode;

/// Loads an executable image into an address space.
///
/// The image format (ELF or otherwise) is entirely the loader's business.
pub trait ProgramLoader: Send + Sync {
    /// Map the segments of `image` into `space` and return the entry point.
    fn load(&self, image: &dyn Vnode, space: &mut dyn AddressSpace) -> Result<VirtAddr>;
}
