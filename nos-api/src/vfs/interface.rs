//! Vnode and file system interfaces
//!
//! The process subsystem never owns a concrete file system. It holds open
//! files as `Arc<dyn Vnode>` and the underlying object is closed when the
//! last descriptor (or cwd reference) holding it is dropped.

use alloc::sync::Arc;

use crate::core::types::{Offset, OpenFlags};
use crate::error::Result;

/// An open file, device or directory.
///
/// Offsets are owned by the descriptor slot, never by the vnode, so every
/// transfer names its position explicitly.
pub trait Vnode: Send + Sync {
    /// Read into `buf` starting at `offset`, returning the bytes transferred.
    fn read_at(&self, offset: Offset, buf: &mut [u8]) -> Result<usize>;

    /// Write `buf` starting at `offset`, returning the bytes transferred.
    fn write_at(&self, offset: Offset, buf: &[u8]) -> Result<usize>;

    /// Whether `lseek` may reposition a descriptor on this object.
    /// Consoles and pipes answer `false`.
    fn is_seekable(&self) -> bool {
        true
    }

    /// Current size in bytes, used by `SEEK_END`.
    fn size(&self) -> Result<Offset>;

    fn is_dir(&self) -> bool {
        false
    }
}

/// The mounted file system as seen by the process subsystem.
///
/// Paths handed in are already resolved against the caller's working
/// directory; device names such as `con:` are passed through untouched.
pub trait Vfs: Send + Sync {
    /// Open (and with `O_CREAT` possibly create) the object at `path`.
    fn open(&self, path: &str, flags: OpenFlags, mode: u32) -> Result<Arc<dyn Vnode>>;

    /// Resolve `path` to a directory suitable as a working directory.
    ///
    /// Returns `NotDirectory` when the object exists but is not a directory.
    fn open_dir(&self, path: &str) -> Result<Arc<dyn Vnode>>;
}
