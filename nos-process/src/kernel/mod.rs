//! Process-level kernel operations
//!
//! `Kernel` ties the registry to the collaborators the process subsystem
//! depends on. Every operation names the calling process explicitly; there
//! is no ambient "current process".

mod file;
mod lifecycle;

use alloc::sync::Arc;

use log::info;
use nos_api::core::types::{STDERR_FILENO, STDIN_FILENO, STDOUT_FILENO};
use nos_api::{AccessMode, AddressSpaceFactory, OpenFlags, ProgramLoader, Result, Vfs};

use crate::config::ProcessConfig;
use crate::process::Process;
use crate::registry::ProcessRegistry;
use crate::thread::ThreadHost;

pub struct Kernel {
    registry: ProcessRegistry,
    vfs: Arc<dyn Vfs>,
    vm: Arc<dyn AddressSpaceFactory>,
    loader: Arc<dyn ProgramLoader>,
    threads: Arc<dyn ThreadHost>,
}

impl Kernel {
    pub fn new(
        config: ProcessConfig,
        vfs: Arc<dyn Vfs>,
        vm: Arc<dyn AddressSpaceFactory>,
        loader: Arc<dyn ProgramLoader>,
        threads: Arc<dyn ThreadHost>,
    ) -> Result<Self> {
        Ok(Self {
            registry: ProcessRegistry::new(config)?,
            vfs,
            vm,
            loader,
            threads,
        })
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ProcessConfig {
        self.registry.config()
    }

    pub fn threads(&self) -> &Arc<dyn ThreadHost> {
        &self.threads
    }

    pub fn root(&self) -> &Arc<Process> {
        self.registry.root()
    }

    /// Open the console on descriptors 0 (read-only), 1 and 2 (write-only).
    pub fn stdio_init(&self, process: &Process) -> Result<()> {
        let console = self.config().console_path.as_str();
        let streams = [
            (STDIN_FILENO, OpenFlags::O_RDONLY, AccessMode::READ),
            (STDOUT_FILENO, OpenFlags::O_WRONLY, AccessMode::WRITE),
            (STDERR_FILENO, OpenFlags::O_WRONLY, AccessMode::WRITE),
        ];
        for (fd, flags, mode) in streams {
            let vnode = self.vfs.open(console, flags, 0o664)?;
            process.fds().install_stream(fd, mode, vnode)?;
        }
        Ok(())
    }

    /// Create the first user process under the root, with its standard
    /// streams on the console and the root's working directory.
    ///
    /// The caller runs it, typically by calling [`Kernel::exec`] on its
    /// behalf and then entering user mode.
    pub fn spawn_runprogram(&self, name: &str) -> Result<Arc<Process>> {
        let process = self.registry.register(self.root(), name)?;
        if let Err(err) = self.stdio_init(&process) {
            self.registry.release_unstarted(&process);
            return Err(err);
        }
        process.set_cwd(self.root().cwd());
        process.attach_thread();
        info!("runprogram: process {} ({}) ready", process.pid(), name);
        Ok(process)
    }
}
