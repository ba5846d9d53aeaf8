use alloc::string::String;
use alloc::sync::Arc;

use log::{debug, info, warn};
use nos_api::{AddressSpace, Error, OpenFlags, Pid, Result, TrapFrame, Vnode};

use super::Kernel;
use crate::exec::{self, ExecImage};
use crate::path;
use crate::process::Process;
use crate::registry::ProcessRegistry;

/// Releases a registered child that never started; disarmed once the
/// child's thread is running.
struct ForkRollback<'a> {
    registry: &'a ProcessRegistry,
    child: Option<Arc<Process>>,
}

impl ForkRollback<'_> {
    fn disarm(mut self) {
        self.child = None;
    }
}

impl Drop for ForkRollback<'_> {
    fn drop(&mut self) {
        if let Some(child) = self.child.take() {
            warn!("fork: rolling back child {}", child.pid());
            self.registry.release_unstarted(&child);
        }
    }
}

impl Kernel {
    /// Duplicate `cur` into a new child process and start its thread.
    ///
    /// The child gets a copy of the address space, the same working
    /// directory, a copy of every open descriptor, and resumes from `frame`
    /// with a return value of 0. Returns the child's pid to the parent.
    pub fn fork(&self, cur: &Arc<Process>, frame: &TrapFrame) -> Result<Pid> {
        let child = self.registry.register(cur, cur.name())?;
        let rollback = ForkRollback {
            registry: &self.registry,
            child: Some(child.clone()),
        };

        if let Some(space) = cur.addrspace().as_ref() {
            child.set_addrspace(Some(space.copy()?));
        }
        child.set_cwd(cur.cwd());
        cur.fds().fork_into(child.fds());

        child.attach_thread();
        self.threads.fork_thread(child.clone(), frame.fork_child())?;
        rollback.disarm();

        info!("fork: {} -> {}", cur.pid(), child.pid());
        Ok(child.pid())
    }

    /// Replace the image of `cur` with the program at `path`.
    ///
    /// On success the old address space is gone and the returned image is
    /// ready for [`crate::ThreadHost::enter_user`]. On failure `cur` keeps
    /// running its previous image.
    pub fn exec(&self, cur: &Arc<Process>, path: &str, argv: &[String]) -> Result<ExecImage> {
        if cur.thread_count() != 1 {
            return Err(Error::InvalidArgument);
        }
        exec::validate_args(argv, self.config().arg_max)?;

        let cwd = cur.cwd();
        let resolved = path::resolve(cwd.as_ref().map(|cwd| cwd.path.as_str()), path)?;
        let image = self.vfs.open(&resolved, OpenFlags::O_RDONLY, 0)?;
        let fresh = self.vm.create()?;

        let previous = cur.switch_addrspace(Some(fresh));
        match self.load_image(cur, image.as_ref(), argv) {
            Ok(loaded) => {
                drop(previous);
                info!("exec: process {} now running {}", cur.pid(), resolved);
                Ok(loaded)
            }
            Err(err) => {
                warn!("exec: process {} failed to load {}: {}", cur.pid(), resolved, err);
                let _failed = cur.switch_addrspace(previous);
                Err(err)
            }
        }
    }

    fn load_image(&self, cur: &Process, image: &dyn Vnode, argv: &[String]) -> Result<ExecImage> {
        let mut slot = cur.addrspace();
        let space: &mut dyn AddressSpace = slot.as_deref_mut().ok_or(Error::Fault)?;

        let entry = self.loader.load(image, space)?;
        let stack_top = space.define_stack()?;
        let stack_ptr = exec::copyout_args(space, stack_top, argv)?;

        Ok(ExecImage {
            entry,
            stack_ptr,
            argc: argv.len(),
            argv: stack_ptr,
        })
    }

    /// Record the exit of `cur`. The caller then ends its thread through
    /// [`crate::ThreadHost::exit_thread`].
    pub fn exit(&self, cur: &Process, code: i32) {
        self.registry.exit(cur, code);
        cur.detach_thread();
    }

    /// Wait for child `pid` of `cur`; see [`ProcessRegistry::waitpid`].
    ///
    /// No options are supported.
    pub fn waitpid(&self, cur: &Process, pid: Pid, options: i32, reap: bool) -> Result<i32> {
        if options != 0 {
            return Err(Error::InvalidArgument);
        }
        debug!("waitpid: {} on {} (reap: {})", cur.pid(), pid, reap);
        self.registry.waitpid(cur, pid, reap)
    }

    pub fn getpid(&self, cur: &Process) -> Pid {
        self.registry.getpid(cur)
    }
}
