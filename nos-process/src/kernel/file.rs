use alloc::string::String;
use alloc::sync::Arc;
use core::ptr;

use log::debug;
use nos_api::{AccessMode, Error, Fd, Offset, OpenFlags, Result, Vnode, Whence};

use super::Kernel;
use crate::path;
use crate::process::{Cwd, Process};

impl Kernel {
    fn resolve(&self, cur: &Process, path: &str) -> Result<String> {
        let cwd = cur.cwd();
        path::resolve(cwd.as_ref().map(|cwd| cwd.path.as_str()), path)
    }

    /// Open `path` and install it in the lowest free descriptor of `cur`.
    pub fn open(&self, cur: &Process, path: &str, flags: OpenFlags, mode: u32) -> Result<Fd> {
        let access = flags.access_mode()?;
        let resolved = self.resolve(cur, path)?;
        let vnode = self.vfs.open(&resolved, flags, mode)?;
        let fd = cur.fds().install(access, 0, vnode)?;
        debug!("open: process {} {} -> fd {}", cur.pid(), resolved, fd);
        Ok(fd)
    }

    pub fn close(&self, cur: &Process, fd: Fd) -> Result<()> {
        cur.fds().clear(fd).map(drop).ok_or(Error::BadDescriptor)
    }

    /// Snapshot the handle and offset of `fd` if it is open for `access`.
    ///
    /// The slot lock is released before any I/O so a blocking device does
    /// not stall other users of the slot.
    fn begin_io(cur: &Process, fd: Fd, access: AccessMode) -> Result<(Arc<dyn Vnode>, Offset)> {
        let entry = cur.fds().slot(fd)?.lock();
        match entry.vnode.as_ref() {
            Some(vnode) if entry.mode.contains(access) => Ok((vnode.clone(), entry.offset)),
            _ => Err(Error::BadDescriptor),
        }
    }

    /// Publish the offset reached by a transfer, unless the slot was closed
    /// or reassigned while the I/O ran.
    fn finish_io(cur: &Process, fd: Fd, vnode: &Arc<dyn Vnode>, offset: Offset) -> Result<()> {
        let mut entry = cur.fds().slot(fd)?.lock();
        let same = entry
            .vnode
            .as_ref()
            .is_some_and(|current| ptr::addr_eq(Arc::as_ptr(current), Arc::as_ptr(vnode)));
        if same {
            entry.offset = offset;
        }
        Ok(())
    }

    /// Read from `fd` at its current offset, advancing the offset by the
    /// number of bytes read.
    pub fn read(&self, cur: &Process, fd: Fd, buf: &mut [u8]) -> Result<usize> {
        let (vnode, offset) = Self::begin_io(cur, fd, AccessMode::READ)?;
        let count = vnode.read_at(offset, buf)?;
        Self::finish_io(cur, fd, &vnode, offset + count as Offset)?;
        Ok(count)
    }

    /// Write to `fd` at its current offset, advancing the offset by the
    /// number of bytes written.
    pub fn write(&self, cur: &Process, fd: Fd, buf: &[u8]) -> Result<usize> {
        let (vnode, offset) = Self::begin_io(cur, fd, AccessMode::WRITE)?;
        let count = vnode.write_at(offset, buf)?;
        Self::finish_io(cur, fd, &vnode, offset + count as Offset)?;
        Ok(count)
    }

    /// Reposition the offset of `fd`. `whence` is the raw `SEEK_*` value.
    pub fn lseek(&self, cur: &Process, fd: Fd, offset: Offset, whence: i32) -> Result<Offset> {
        let whence = Whence::try_from(whence)?;
        let mut entry = cur.fds().slot(fd)?.lock();
        let vnode = entry.vnode.clone().ok_or(Error::BadDescriptor)?;
        if !vnode.is_seekable() {
            return Err(Error::NotSeekable);
        }

        let base = match whence {
            Whence::Set => 0,
            Whence::Cur => entry.offset,
            Whence::End => vnode.size()?,
        };
        let position = base.checked_add(offset).ok_or(Error::InvalidArgument)?;
        if position < 0 {
            return Err(Error::InvalidArgument);
        }
        entry.offset = position;
        Ok(position)
    }

    /// Make `new` a duplicate of `old`, closing whatever `new` held.
    ///
    /// The two descriptors share the open file but not the offset.
    pub fn dup2(&self, cur: &Process, old: Fd, new: Fd) -> Result<Fd> {
        let replaced = cur.fds().is_occupied(new) && old != new;
        let fd = cur.fds().duplicate(old, new)?;
        if replaced {
            debug!("dup2: process {} closed fd {} before reuse", cur.pid(), new);
        }
        Ok(fd)
    }

    /// Change the working directory of `cur`.
    pub fn chdir(&self, cur: &Process, path: &str) -> Result<()> {
        let resolved = self.resolve(cur, path)?;
        let dir = self.vfs.open_dir(&resolved)?;
        debug!("chdir: process {} -> {}", cur.pid(), resolved);
        cur.set_cwd(Some(Cwd { dir, path: resolved }));
        Ok(())
    }

    /// Copy the working directory path of `cur` into `buf`, truncated to
    /// fit and without a terminator. Returns the number of bytes copied.
    pub fn getcwd(&self, cur: &Process, buf: &mut [u8]) -> Result<usize> {
        let cwd = cur.cwd().ok_or(Error::NotFound)?;
        let bytes = cwd.path.as_bytes();
        let count = bytes.len().min(buf.len());
        buf[..count].copy_from_slice(&bytes[..count]);
        Ok(count)
    }
}
