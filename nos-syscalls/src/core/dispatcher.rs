//! System call dispatcher
//!
//! Decodes the syscall number from the trap frame, runs the registered
//! handler and writes the outcome back into the frame.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::sync::Arc;

use nos_api::syscall::{SyscallNumber, SyscallResult};
use nos_api::{Error, TrapFrame};
use nos_process::{Kernel, Process};
use spin::Mutex;

use super::traits::{SyscallContext, SyscallHandler};

/// System call dispatcher
pub struct SyscallDispatcher {
    /// Registered system call handlers
    handlers: BTreeMap<SyscallNumber, Box<dyn SyscallHandler>>,
    /// System call statistics
    stats: Mutex<SyscallStats>,
}

impl SyscallDispatcher {
    /// Create a dispatcher with no handlers
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
            stats: Mutex::new(SyscallStats::default()),
        }
    }

    /// Create a dispatcher with every file and process system call
    /// registered.
    pub fn with_default_handlers() -> Self {
        let mut dispatcher = Self::new();
        crate::fs::register_handlers(&mut dispatcher);
        crate::process::register_handlers(&mut dispatcher);
        dispatcher
    }

    /// Register a system call handler under its own ID, replacing any
    /// previous handler for that number.
    pub fn register_handler(&mut self, handler: Box<dyn SyscallHandler>) {
        self.handlers.insert(handler.id(), handler);
    }

    /// Get a system call handler
    pub fn get_handler(&self, id: SyscallNumber) -> Option<&dyn SyscallHandler> {
        self.handlers.get(&id).map(|handler| &**handler)
    }

    /// Run the system call described by `frame` on behalf of `process`.
    ///
    /// The result is encoded into `frame` and the program counter is moved
    /// past the syscall instruction. Unknown numbers fail with `ENOSYS`.
    pub fn dispatch(
        &self,
        kernel: &Kernel,
        process: &Arc<Process>,
        frame: &mut TrapFrame,
    ) -> SyscallResult {
        let id = frame.syscall;
        let ctx = SyscallContext {
            kernel,
            process,
            frame: *frame,
        };

        let result = match self.handlers.get(&id) {
            Some(handler) => {
                crate::sys_trace!(
                    "syscall {}({:?}) from process {}",
                    handler.name(),
                    frame.args,
                    process.pid()
                );
                handler.execute(&ctx, &frame.args)
            }
            None => {
                crate::sys_warn!("unknown syscall {} from process {}", id, process.pid());
                Err(Error::NotSupported)
            }
        };

        {
            let mut stats = self.stats.lock();
            stats.total_calls += 1;
            *stats.calls_by_type.entry(id).or_insert(0) += 1;
            if result.is_err() {
                stats.error_count += 1;
            }
        }

        let result = SyscallResult::from(result);
        crate::sys_trace!("syscall {} -> {:?}", id, result);
        frame.set_result(result);
        frame.advance_pc();
        result
    }

    /// Get system call statistics
    pub fn stats(&self) -> SyscallStats {
        self.stats.lock().clone()
    }
}

impl Default for SyscallDispatcher {
    fn default() -> Self {
        Self::with_default_handlers()
    }
}

/// System call statistics
#[derive(Debug, Clone, Default)]
pub struct SyscallStats {
    /// Total number of system calls
    pub total_calls: u64,
    /// Number of calls by type
    pub calls_by_type: BTreeMap<SyscallNumber, u64>,
    /// Number of errors
    pub error_count: u64,
}
