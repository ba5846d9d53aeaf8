//! Per-process file descriptor table
//!
//! A table is a fixed array of slots, each behind its own lock, plus a
//! cached index of the lowest free slot at or above [`FIRST_FREE_FD`].
//! Descriptors 0, 1 and 2 are filled at process creation with
//! [`FdTable::install_stream`] and are never handed out by
//! [`FdTable::install`].
//!
//! Lock order: a slot lock is never held while another slot of the same
//! table is locked, except in [`FdTable::fork_into`] where the parent slot is
//! taken before the child slot.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};

use log::debug;
use nos_api::core::types::{FIRST_FREE_FD, STDERR_FILENO};
use nos_api::{AccessMode, Error, Fd, Offset, Result, Vnode};

use crate::sync::Mutex;

/// Cursor value meaning "no free slot at or above `FIRST_FREE_FD`".
pub const NO_FREE_SLOT: usize = usize::MAX;

/// One descriptor slot.
///
/// A slot is occupied exactly when it holds a vnode.
#[derive(Clone, Default)]
pub struct FdEntry {
    pub vnode: Option<Arc<dyn Vnode>>,
    pub offset: Offset,
    pub mode: AccessMode,
}

impl FdEntry {
    pub fn is_occupied(&self) -> bool {
        self.vnode.is_some()
    }

    fn fill(&mut self, mode: AccessMode, offset: Offset, vnode: Arc<dyn Vnode>) {
        self.vnode = Some(vnode);
        self.offset = offset;
        self.mode = mode;
    }

    fn reset(&mut self) -> Option<Arc<dyn Vnode>> {
        self.offset = 0;
        self.mode = AccessMode::empty();
        self.vnode.take()
    }
}

impl fmt::Debug for FdEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FdEntry")
            .field("occupied", &self.is_occupied())
            .field("offset", &self.offset)
            .field("mode", &self.mode)
            .finish()
    }
}

/// Fixed-capacity descriptor table owned by one process.
pub struct FdTable {
    slots: Vec<Mutex<FdEntry>>,
    first_free: AtomicUsize,
}

impl FdTable {
    /// Create an empty table with `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        let slots = (0..capacity).map(|_| Mutex::new(FdEntry::default())).collect();
        let first_free = if capacity > FIRST_FREE_FD {
            FIRST_FREE_FD
        } else {
            NO_FREE_SLOT
        };
        Self {
            slots,
            first_free: AtomicUsize::new(first_free),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Lowest free index at or above `FIRST_FREE_FD`, or `None` when full.
    pub fn first_free(&self) -> Option<usize> {
        match self.first_free.load(Ordering::SeqCst) {
            NO_FREE_SLOT => None,
            index => Some(index),
        }
    }

    /// Slot for `fd`, or `None` when `fd` is out of range.
    pub fn lookup(&self, fd: Fd) -> Option<&Mutex<FdEntry>> {
        usize::try_from(fd).ok().and_then(|index| self.slots.get(index))
    }

    /// Like [`FdTable::lookup`] but reports out-of-range as `BadDescriptor`.
    pub fn slot(&self, fd: Fd) -> Result<&Mutex<FdEntry>> {
        self.lookup(fd).ok_or(Error::BadDescriptor)
    }

    pub fn is_occupied(&self, fd: Fd) -> bool {
        self.lookup(fd).is_some_and(|slot| slot.lock().is_occupied())
    }

    /// Occupied and open for reading.
    pub fn is_readable(&self, fd: Fd) -> bool {
        self.has_mode(fd, AccessMode::READ)
    }

    /// Occupied and open for writing.
    pub fn is_writable(&self, fd: Fd) -> bool {
        self.has_mode(fd, AccessMode::WRITE)
    }

    fn has_mode(&self, fd: Fd, mode: AccessMode) -> bool {
        self.lookup(fd).is_some_and(|slot| {
            let entry = slot.lock();
            entry.is_occupied() && entry.mode.contains(mode)
        })
    }

    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.lock().is_occupied()).count()
    }

    /// Place `vnode` in the lowest free slot at or above `FIRST_FREE_FD`.
    ///
    /// Returns `OutOfDescriptors` when no such slot exists.
    pub fn install(&self, mode: AccessMode, offset: Offset, vnode: Arc<dyn Vnode>) -> Result<Fd> {
        loop {
            let mut index = self.first_free.load(Ordering::SeqCst);
            if index == NO_FREE_SLOT {
                index = self.rescan();
            }
            if index == NO_FREE_SLOT {
                return Err(Error::OutOfDescriptors);
            }

            let mut entry = self.slots[index].lock();
            if entry.is_occupied() {
                // Another installer got here first; the cursor is stale.
                drop(entry);
                self.rescan();
                continue;
            }
            entry.fill(mode, offset, vnode);
            drop(entry);

            self.rescan();
            debug!("fdtable: installed fd {} mode {:?}", index, mode);
            return Ok(index as Fd);
        }
    }

    /// Fill one of the reserved standard-stream slots at offset 0.
    pub fn install_stream(&self, fd: Fd, mode: AccessMode, vnode: Arc<dyn Vnode>) -> Result<()> {
        if !(0..=STDERR_FILENO).contains(&fd) {
            return Err(Error::InvalidArgument);
        }
        let slot = self.slot(fd)?;
        slot.lock().fill(mode, 0, vnode);
        self.rescan();
        Ok(())
    }

    /// Reset slot `fd`, returning the handle it held.
    ///
    /// `None` when `fd` is out of range or the slot was already free.
    pub fn clear(&self, fd: Fd) -> Option<Arc<dyn Vnode>> {
        let slot = self.lookup(fd)?;
        let released = slot.lock().reset()?;
        let index = fd as usize;
        if index >= FIRST_FREE_FD {
            self.first_free.fetch_min(index, Ordering::SeqCst);
        }
        debug!("fdtable: cleared fd {}", fd);
        Some(released)
    }

    /// Make `new` refer to the same open file as `old`.
    ///
    /// The handle is shared, the offset and mode are copied, so the two
    /// descriptors move independently afterwards. `old == new` succeeds
    /// without touching anything. An occupied `new` is closed by the
    /// overwrite, under its slot lock.
    pub fn duplicate(&self, old: Fd, new: Fd) -> Result<Fd> {
        let source = self.slot(old)?;
        let target = self.slot(new)?;
        if old == new {
            return Ok(new);
        }

        let copied = source.lock().clone();
        if !copied.is_occupied() {
            return Err(Error::BadDescriptor);
        }

        let mut entry = target.lock();
        if !entry.is_occupied() && self.first_free().is_none() {
            // The cursor may be stale. `rescan` locks every slot, so it
            // cannot run while the target is held.
            drop(entry);
            let free = self.rescan();
            entry = target.lock();
            if !entry.is_occupied() && free == NO_FREE_SLOT {
                return Err(Error::TableFull);
            }
        }
        *entry = copied;
        drop(entry);

        self.rescan();
        debug!("fdtable: duplicated fd {} onto {}", old, new);
        Ok(new)
    }

    /// Copy every occupied slot into the same index of `child`.
    ///
    /// Handles are shared with the child; offsets and modes are copied.
    pub fn fork_into(&self, child: &FdTable) {
        for (parent_slot, child_slot) in self.slots.iter().zip(child.slots.iter()) {
            let parent_entry = parent_slot.lock();
            let mut child_entry = child_slot.lock();
            if parent_entry.is_occupied() {
                *child_entry = parent_entry.clone();
            }
        }
        child.rescan();
    }

    /// Close every descriptor.
    pub fn teardown(&self) {
        for slot in &self.slots {
            slot.lock().reset();
        }
        self.first_free.store(
            if self.capacity() > FIRST_FREE_FD {
                FIRST_FREE_FD
            } else {
                NO_FREE_SLOT
            },
            Ordering::SeqCst,
        );
    }

    /// Recompute the cursor with a scan from `FIRST_FREE_FD` upward.
    fn rescan(&self) -> usize {
        let index = self.slots[FIRST_FREE_FD.min(self.capacity())..]
            .iter()
            .position(|slot| !slot.lock().is_occupied())
            .map_or(NO_FREE_SLOT, |offset| offset + FIRST_FREE_FD);
        self.first_free.store(index, Ordering::SeqCst);
        index
    }
}

impl Drop for FdTable {
    fn drop(&mut self) {
        self.teardown();
    }
}
