//! System call traits
//!
//! This module provides the handler trait and the context each handler
//! runs in.

use alloc::sync::Arc;

use nos_api::syscall::SyscallNumber;
use nos_api::{Result, TrapFrame};
use nos_process::{Kernel, Process};

/// Everything a handler may touch: the kernel, the calling process and
/// the trap frame as it was on entry.
pub struct SyscallContext<'a> {
    pub kernel: &'a Kernel,
    pub process: &'a Arc<Process>,
    pub frame: TrapFrame,
}

/// System call handler trait
pub trait SyscallHandler: Send + Sync {
    /// Execute the system call. Handlers for calls that do not return to
    /// the caller (`_exit`, a successful `execv`) never come back.
    fn execute(&self, ctx: &SyscallContext<'_>, args: &[usize]) -> Result<isize>;

    /// Get the system call name
    fn name(&self) -> &str;

    /// Get the system call ID
    fn id(&self) -> SyscallNumber;
}
