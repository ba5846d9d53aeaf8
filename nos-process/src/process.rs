//! The process entity
//!
//! A `Process` owns the resources that outlive any single syscall: its
//! descriptor table, its address space and its working directory. Its
//! lifecycle state and place in the process tree live in the registry,
//! which is the only owner that keeps a process alive after its thread is
//! gone.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use core::fmt;
use core::mem;
use core::sync::atomic::{AtomicUsize, Ordering};

use log::debug;
use nos_api::{AddressSpace, Pid, Vnode};

use crate::fdtable::FdTable;
use crate::sync::{Mutex, MutexGuard};

/// A working directory: the directory vnode and the path it was reached by.
#[derive(Clone)]
pub struct Cwd {
    pub dir: Arc<dyn Vnode>,
    pub path: String,
}

impl fmt::Debug for Cwd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cwd").field(&self.path).finish()
    }
}

pub struct Process {
    pid: Pid,
    name: String,
    fds: FdTable,
    addrspace: Mutex<Option<Box<dyn AddressSpace>>>,
    cwd: Mutex<Option<Cwd>>,
    threads: AtomicUsize,
}

impl Process {
    pub(crate) fn new(pid: Pid, name: &str, open_max: usize) -> Self {
        Self {
            pid,
            name: String::from(name),
            fds: FdTable::new(open_max),
            addrspace: Mutex::new(None),
            cwd: Mutex::new(None),
            threads: AtomicUsize::new(0),
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fds(&self) -> &FdTable {
        &self.fds
    }

    /// Lock and return the address space slot; `None` for kernel-only
    /// processes.
    pub fn addrspace(&self) -> MutexGuard<'_, Option<Box<dyn AddressSpace>>> {
        self.addrspace.lock()
    }

    pub fn has_addrspace(&self) -> bool {
        self.addrspace.lock().is_some()
    }

    /// Install an address space without activating it (the process is not
    /// running yet).
    pub(crate) fn set_addrspace(&self, space: Option<Box<dyn AddressSpace>>) {
        *self.addrspace.lock() = space;
    }

    /// Switch the running process to `space`: the current space is
    /// deactivated, `space` is activated, and the previous one is returned
    /// to the caller to keep or drop.
    pub(crate) fn switch_addrspace(
        &self,
        space: Option<Box<dyn AddressSpace>>,
    ) -> Option<Box<dyn AddressSpace>> {
        let mut slot = self.addrspace.lock();
        if let Some(current) = slot.as_ref() {
            current.deactivate();
        }
        let previous = mem::replace(&mut *slot, space);
        if let Some(next) = slot.as_ref() {
            next.activate();
        }
        previous
    }

    pub fn cwd(&self) -> Option<Cwd> {
        self.cwd.lock().clone()
    }

    pub(crate) fn set_cwd(&self, cwd: Option<Cwd>) {
        *self.cwd.lock() = cwd;
    }

    pub fn thread_count(&self) -> usize {
        self.threads.load(Ordering::SeqCst)
    }

    pub(crate) fn attach_thread(&self) {
        self.threads.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn detach_thread(&self) {
        let previous = self.threads.fetch_sub(1, Ordering::SeqCst);
        assert!(previous > 0, "thread detached from process {} with no threads", self.pid);
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("pid", &self.pid)
            .field("name", &self.name)
            .field("threads", &self.thread_count())
            .field("open_fds", &self.fds.occupied_count())
            .finish()
    }
}

impl Drop for Process {
    fn drop(&mut self) {
        debug!("process {} ({}) reclaimed", self.pid, self.name);
    }
}
