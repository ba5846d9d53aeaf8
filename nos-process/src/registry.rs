//! Process registry
//!
//! The registry is the pid table. It owns every live `Process` through an
//! `Arc`, records each process's lifecycle state, exit code and parent, and
//! keeps the child lists that `waitpid` and reparenting walk. All of that is
//! guarded by one lock; a condition variable is broadcast whenever a process
//! becomes a zombie or a slot is released.
//!
//! ```text
//!   Running ──exit──▶ Zombie ──reap──▶ Available
//!      │  ╲                ▲
//!      │   parent exits    │ exit
//!      │     ╲             │
//!      │      ▶ Orphan ────┘
//!      ▼        │
//!   Exited ◀────┘  (torn down without reaping) ──▶ Available
//! ```

use alloc::string::String;
use alloc::sync::{Arc, Weak};
use alloc::vec::Vec;
use core::fmt;

use log::{debug, info, warn};
use nos_api::core::types::{FIRST_USER_PID, ROOT_PID};
use nos_api::{Error, Pid, Result};

use crate::config::ProcessConfig;
use crate::process::Process;
use crate::sync::{CondVar, Mutex, MutexGuard};

/// Name of the root process created with the registry.
pub const ROOT_NAME: &str = "[kernel]";

/// Lifecycle state of a pid slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcState {
    /// The process has a thread executing on its behalf.
    Running,
    /// Exited; exit code retained until the parent reaps it.
    Zombie,
    /// Torn down without being reaped.
    Exited,
    /// Still running, but its original parent has exited.
    Orphan,
    /// Free for reuse.
    Available,
}

impl ProcState {
    pub fn can_transition_to(self, next: ProcState) -> bool {
        use ProcState::*;
        match self {
            Running => matches!(next, Zombie | Exited | Orphan),
            Orphan => matches!(next, Zombie | Exited),
            Zombie => matches!(next, Available),
            Exited => matches!(next, Available),
            Available => matches!(next, Running),
        }
    }

    /// Whether a process in this state still has its thread.
    pub fn is_running(self) -> bool {
        matches!(self, ProcState::Running | ProcState::Orphan)
    }
}

impl fmt::Display for ProcState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcState::Running => "running",
            ProcState::Zombie => "zombie",
            ProcState::Exited => "exited",
            ProcState::Orphan => "orphan",
            ProcState::Available => "available",
        };
        f.write_str(name)
    }
}

struct ProcSlot {
    process: Arc<Process>,
    state: ProcState,
    exit_code: i32,
    parent: Option<Pid>,
    children: Vec<Weak<Process>>,
}

impl ProcSlot {
    fn transition(&mut self, next: ProcState) {
        assert!(
            self.state.can_transition_to(next),
            "process {}: illegal state transition {} -> {}",
            self.process.pid(),
            self.state,
            next
        );
        self.state = next;
    }

    fn has_child(&self, pid: Pid) -> bool {
        self.children
            .iter()
            .any(|child| child.upgrade().is_some_and(|child| child.pid() == pid))
    }

    fn unlink_child(&mut self, pid: Pid) {
        self.children
            .retain(|child| child.upgrade().is_some_and(|child| child.pid() != pid));
    }
}

struct RegistryInner {
    slots: Vec<Option<ProcSlot>>,
    /// Lowest free pid at or above `FIRST_USER_PID`; `None` when full.
    first_free: Option<Pid>,
}

impl RegistryInner {
    fn slot(&self, pid: Pid) -> Option<&ProcSlot> {
        self.slots.get(pid as usize).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, pid: Pid) -> Option<&mut ProcSlot> {
        self.slots.get_mut(pid as usize).and_then(Option::as_mut)
    }

    fn rescan(&mut self) {
        self.first_free = (FIRST_USER_PID as usize..self.slots.len())
            .find(|&pid| self.slots[pid].is_none())
            .map(|pid| pid as Pid);
    }

    /// Drop the registry's reference to `pid` and make the pid reusable.
    fn release(&mut self, pid: Pid) -> Option<ProcSlot> {
        let mut slot = self.slots.get_mut(pid as usize)?.take()?;
        slot.transition(ProcState::Available);
        if let Some(parent) = slot.parent.and_then(|parent| self.slot_mut(parent)) {
            parent.unlink_child(pid);
        }
        if self.first_free.is_none_or(|free| pid < free) {
            self.first_free = Some(pid);
        }
        Some(slot)
    }
}

/// The pid table and process tree.
pub struct ProcessRegistry {
    config: ProcessConfig,
    inner: Mutex<RegistryInner>,
    exited: CondVar,
    root: Arc<Process>,
}

impl ProcessRegistry {
    /// Create the table and its root process (pid 1, no address space).
    pub fn new(config: ProcessConfig) -> Result<Self> {
        config.validate()?;

        let root = Arc::new(Process::new(ROOT_PID, ROOT_NAME, config.open_max));
        root.attach_thread();

        let mut slots: Vec<Option<ProcSlot>> = (0..=config.max_pid).map(|_| None).collect();
        slots[ROOT_PID as usize] = Some(ProcSlot {
            process: root.clone(),
            state: ProcState::Running,
            exit_code: 0,
            parent: None,
            children: Vec::new(),
        });

        let mut inner = RegistryInner {
            slots,
            first_free: None,
        };
        inner.rescan();

        info!("process registry: {} pids, {} fds per process", config.max_pid, config.open_max);
        Ok(Self {
            config,
            inner: Mutex::new(inner),
            exited: CondVar::new(),
            root,
        })
    }

    pub fn config(&self) -> &ProcessConfig {
        &self.config
    }

    pub fn root(&self) -> &Arc<Process> {
        &self.root
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock()
    }

    /// Allocate a pid for a new child of `parent` and mark it `Running`.
    ///
    /// Returns `TooManyProcesses` when every pid is taken and
    /// `InvalidArgument` when `parent` is not a live process.
    pub fn register(&self, parent: &Arc<Process>, name: &str) -> Result<Arc<Process>> {
        let mut inner = self.lock();

        let parent_running = inner
            .slot(parent.pid())
            .is_some_and(|slot| Arc::ptr_eq(&slot.process, parent) && slot.state.is_running());
        if !parent_running {
            return Err(Error::InvalidArgument);
        }

        let pid = inner.first_free.ok_or(Error::TooManyProcesses)?;
        let process = Arc::new(Process::new(pid, name, self.config.open_max));
        inner.slots[pid as usize] = Some(ProcSlot {
            process: process.clone(),
            state: ProcState::Running,
            exit_code: 0,
            parent: Some(parent.pid()),
            children: Vec::new(),
        });
        if let Some(parent_slot) = inner.slot_mut(parent.pid()) {
            parent_slot.children.push(Arc::downgrade(&process));
        }
        inner.rescan();

        info!("process {} ({}) created by {}", pid, name, parent.pid());
        Ok(process)
    }

    /// Record that `process` exited with `code`.
    ///
    /// Its children move under the root process (running ones become
    /// `Orphan`), it becomes a `Zombie`, and every waiter is woken.
    pub fn exit(&self, process: &Process, code: i32) {
        let pid = process.pid();
        assert_ne!(pid, ROOT_PID, "the root process cannot exit");

        let mut inner = self.lock();
        let children = match inner.slot_mut(pid) {
            Some(slot) => core::mem::take(&mut slot.children),
            None => panic!("exit of unregistered process {}", pid),
        };

        let mut adopted = Vec::new();
        for child in children {
            let Some(process) = child.upgrade() else {
                continue;
            };
            let Some(slot) = inner.slot_mut(process.pid()) else {
                continue;
            };
            match slot.state {
                ProcState::Running => slot.transition(ProcState::Orphan),
                ProcState::Orphan | ProcState::Zombie => {}
                ProcState::Exited | ProcState::Available => continue,
            }
            slot.parent = Some(ROOT_PID);
            adopted.push(child);
        }
        if !adopted.is_empty() {
            debug!("process {}: {} children reparented to {}", pid, adopted.len(), ROOT_PID);
        }
        if let Some(root) = inner.slot_mut(ROOT_PID) {
            root.children.extend(adopted);
        }

        if let Some(slot) = inner.slot_mut(pid) {
            slot.transition(ProcState::Zombie);
            slot.exit_code = code;
        }
        self.exited.notify_all();
        info!("process {} exited with code {}", pid, code);
    }

    /// Wait for child `pid` of `parent` to exit and return its exit code.
    ///
    /// With `reap` the child's pid is released and a second wait fails with
    /// `NoSuchChild`; without it the zombie stays in place.
    pub fn waitpid(&self, parent: &Process, pid: Pid, reap: bool) -> Result<i32> {
        let mut inner = self.lock();
        loop {
            let is_child = inner.slot(parent.pid()).is_some_and(|slot| slot.has_child(pid))
                && inner.slot(pid).is_some_and(|slot| slot.parent == Some(parent.pid()));
            if !is_child {
                return Err(Error::NoSuchChild);
            }

            let zombie_code = inner
                .slot(pid)
                .filter(|slot| slot.state == ProcState::Zombie)
                .map(|slot| slot.exit_code);
            if let Some(code) = zombie_code {
                if reap {
                    inner.release(pid);
                    self.exited.notify_all();
                    debug!("process {} reaped {} (code {})", parent.pid(), pid, code);
                }
                return Ok(code);
            }

            debug!("process {} waiting on {}", parent.pid(), pid);
            inner = self.exited.wait(&self.inner, inner);
        }
    }

    /// Pid of `process`, read under the registry lock.
    pub fn getpid(&self, process: &Process) -> Pid {
        let _inner = self.lock();
        process.pid()
    }

    /// Undo a registration whose process never ran (fork rollback).
    pub fn release_unstarted(&self, process: &Arc<Process>) {
        let pid = process.pid();
        let mut inner = self.lock();
        match inner.slot_mut(pid) {
            Some(slot) if Arc::ptr_eq(&slot.process, process) => {
                slot.transition(ProcState::Exited);
            }
            _ => return,
        }
        inner.release(pid);
        self.exited.notify_all();
        warn!("process {} released before it ran", pid);
    }

    /// Reap every zombie the root process has adopted.
    pub fn reap_orphans(&self) -> usize {
        let mut inner = self.lock();
        let zombies: Vec<Pid> = inner
            .slots
            .iter()
            .flatten()
            .filter(|slot| slot.parent == Some(ROOT_PID) && slot.state == ProcState::Zombie)
            .map(|slot| slot.process.pid())
            .collect();
        for &pid in &zombies {
            inner.release(pid);
        }
        if !zombies.is_empty() {
            self.exited.notify_all();
            debug!("root reaped {} orphaned zombies", zombies.len());
        }
        zombies.len()
    }

    /// Tear down every process but the root and free every pid.
    pub fn shutdown(&self) -> usize {
        let mut inner = self.lock();
        let mut released = 0;
        for pid in FIRST_USER_PID..=self.config.max_pid {
            let Some(slot) = inner.slot_mut(pid) else {
                continue;
            };
            if slot.state.is_running() {
                slot.transition(ProcState::Exited);
            }
            inner.release(pid);
            released += 1;
        }
        if let Some(root) = inner.slot_mut(ROOT_PID) {
            root.children.clear();
        }
        inner.rescan();
        self.exited.notify_all();
        info!("process registry shut down, {} processes released", released);
        released
    }

    /// State of `pid`; empty slots report `Available`, out-of-range pids `None`.
    pub fn state_of(&self, pid: Pid) -> Option<ProcState> {
        let inner = self.lock();
        if pid == 0 || pid as usize >= inner.slots.len() {
            return None;
        }
        Some(inner.slot(pid).map_or(ProcState::Available, |slot| slot.state))
    }

    pub fn exit_code_of(&self, pid: Pid) -> Option<i32> {
        let inner = self.lock();
        inner
            .slot(pid)
            .filter(|slot| slot.state == ProcState::Zombie)
            .map(|slot| slot.exit_code)
    }

    pub fn parent_of(&self, pid: Pid) -> Option<Pid> {
        self.lock().slot(pid).and_then(|slot| slot.parent)
    }

    /// Pids of the children of `pid`, in creation (or adoption) order.
    pub fn children_of(&self, pid: Pid) -> Vec<Pid> {
        self.lock().slot(pid).map_or_else(Vec::new, |slot| {
            slot.children
                .iter()
                .filter_map(Weak::upgrade)
                .map(|child| child.pid())
                .collect()
        })
    }

    pub fn lookup(&self, pid: Pid) -> Option<Arc<Process>> {
        self.lock().slot(pid).map(|slot| slot.process.clone())
    }

    /// Number of occupied pid slots, the root included.
    pub fn live_count(&self) -> usize {
        self.lock().slots.iter().flatten().count()
    }

    /// Lowest pid the next registration will receive.
    pub fn next_pid(&self) -> Option<Pid> {
        self.lock().first_free
    }

    /// Names of every registered process, for diagnostics.
    pub fn process_names(&self) -> Vec<(Pid, String)> {
        self.lock()
            .slots
            .iter()
            .flatten()
            .map(|slot| (slot.process.pid(), String::from(slot.process.name())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_registry(max_pid: Pid) -> ProcessRegistry {
        ProcessRegistry::new(ProcessConfig {
            max_pid,
            open_max: 8,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_transition_table() {
        use ProcState::*;
        assert!(Running.can_transition_to(Zombie));
        assert!(Running.can_transition_to(Orphan));
        assert!(Orphan.can_transition_to(Zombie));
        assert!(Zombie.can_transition_to(Available));
        assert!(Exited.can_transition_to(Available));
        assert!(!Zombie.can_transition_to(Running));
        assert!(!Available.can_transition_to(Zombie));
        assert!(!Exited.can_transition_to(Zombie));
    }

    #[test]
    fn test_root_is_pid_one() {
        let registry = small_registry(4);
        assert_eq!(registry.root().pid(), ROOT_PID);
        assert_eq!(registry.root().name(), ROOT_NAME);
        assert_eq!(registry.state_of(ROOT_PID), Some(ProcState::Running));
        assert_eq!(registry.next_pid(), Some(2));
        assert_eq!(registry.state_of(0), None);
        assert_eq!(registry.state_of(5), None);
        assert_eq!(registry.state_of(4), Some(ProcState::Available));
    }

    #[test]
    fn test_register_links_parent() {
        let registry = small_registry(4);
        let child = registry.register(registry.root(), "child").unwrap();
        assert_eq!(child.pid(), 2);
        assert_eq!(registry.parent_of(2), Some(ROOT_PID));
        assert_eq!(registry.children_of(ROOT_PID), alloc::vec![2]);
        assert_eq!(registry.live_count(), 2);
    }

    #[test]
    fn test_exit_then_reap() {
        let registry = small_registry(4);
        let root = registry.root().clone();
        let child = registry.register(&root, "child").unwrap();
        registry.exit(&child, 42);
        assert_eq!(registry.state_of(2), Some(ProcState::Zombie));
        assert_eq!(registry.exit_code_of(2), Some(42));
        assert_eq!(registry.waitpid(&root, 2, false), Ok(42));
        assert_eq!(registry.waitpid(&root, 2, true), Ok(42));
        assert_eq!(registry.waitpid(&root, 2, true), Err(Error::NoSuchChild));
        assert_eq!(registry.state_of(2), Some(ProcState::Available));
    }

    #[test]
    #[should_panic(expected = "illegal state transition")]
    fn test_double_exit_panics() {
        let registry = small_registry(4);
        let child = registry.register(registry.root(), "child").unwrap();
        registry.exit(&child, 0);
        registry.exit(&child, 0);
    }

    #[test]
    fn test_zombie_cannot_register_children() {
        let registry = small_registry(4);
        let child = registry.register(registry.root(), "child").unwrap();
        registry.exit(&child, 0);
        assert_eq!(registry.register(&child, "late").err(), Some(Error::InvalidArgument));
    }
}
