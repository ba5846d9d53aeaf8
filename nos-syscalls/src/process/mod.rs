//! Process system calls
//!
//! This module provides process management related system calls.

use alloc::boxed::Box;

use nos_api::syscall::SyscallNumber;
use nos_api::{Error, Pid, Result};

use crate::common::{copy_argv_from_user, copy_i32_to_user, copy_path_from_user};
use crate::core::dispatcher::SyscallDispatcher;
use crate::core::traits::{SyscallContext, SyscallHandler};
use crate::types::{SYS_EXECV, SYS_EXIT, SYS_FORK, SYS_GETPID, SYS_WAITPID};

/// Register process system call handlers
pub fn register_handlers(dispatcher: &mut SyscallDispatcher) {
    dispatcher.register_handler(Box::new(ForkHandler));
    dispatcher.register_handler(Box::new(ExecvHandler));
    dispatcher.register_handler(Box::new(WaitpidHandler));
    dispatcher.register_handler(Box::new(ExitHandler));
    dispatcher.register_handler(Box::new(GetpidHandler));
}

/// Fork system call handler
///
/// Returns the child's pid to the parent; the child resumes from the same
/// frame with a return value of 0.
pub struct ForkHandler;

impl SyscallHandler for ForkHandler {
    fn execute(&self, ctx: &SyscallContext<'_>, _args: &[usize]) -> Result<isize> {
        let pid = ctx.kernel.fork(ctx.process, &ctx.frame)?;
        Ok(pid as isize)
    }

    fn name(&self) -> &str {
        "fork"
    }

    fn id(&self) -> SyscallNumber {
        SYS_FORK
    }
}

/// Exec system call handler
///
/// Only returns on failure, in which case the caller keeps its old image.
pub struct ExecvHandler;

impl SyscallHandler for ExecvHandler {
    fn execute(&self, ctx: &SyscallContext<'_>, args: &[usize]) -> Result<isize> {
        let path = copy_path_from_user(ctx.process, args[0])?;
        let argv = copy_argv_from_user(ctx.process, args[1], ctx.kernel.config().arg_max)?;
        crate::sys_debug!("execv {} with {} arguments", path, argv.len());

        let image = ctx.kernel.exec(ctx.process, &path, &argv)?;
        ctx.kernel.threads().enter_user(image)
    }

    fn name(&self) -> &str {
        "execv"
    }

    fn id(&self) -> SyscallNumber {
        SYS_EXECV
    }
}

/// Waitpid system call handler
///
/// A null status pointer, or one that cannot be written, observes the
/// child's exit without reaping it.
pub struct WaitpidHandler;

impl SyscallHandler for WaitpidHandler {
    fn execute(&self, ctx: &SyscallContext<'_>, args: &[usize]) -> Result<isize> {
        let status = args[1];
        let options = args[2] as isize as i32;
        if options != 0 {
            return Err(Error::InvalidArgument);
        }
        let pid = Pid::try_from(args[0] as isize).map_err(|_| Error::NoSuchChild)?;

        let reap = status != 0 && copy_i32_to_user(ctx.process, status, 0).is_ok();
        let code = ctx.kernel.waitpid(ctx.process, pid, options, reap)?;
        if status != 0 {
            copy_i32_to_user(ctx.process, status, code)?;
        }
        Ok(pid as isize)
    }

    fn name(&self) -> &str {
        "waitpid"
    }

    fn id(&self) -> SyscallNumber {
        SYS_WAITPID
    }
}

/// Exit system call handler
pub struct ExitHandler;

impl SyscallHandler for ExitHandler {
    fn execute(&self, ctx: &SyscallContext<'_>, args: &[usize]) -> Result<isize> {
        let code = args[0] as isize as i32;
        ctx.kernel.exit(ctx.process, code);
        ctx.kernel.threads().exit_thread()
    }

    fn name(&self) -> &str {
        "_exit"
    }

    fn id(&self) -> SyscallNumber {
        SYS_EXIT
    }
}

/// Getpid system call handler
pub struct GetpidHandler;

impl SyscallHandler for GetpidHandler {
    fn execute(&self, ctx: &SyscallContext<'_>, _args: &[usize]) -> Result<isize> {
        Ok(ctx.kernel.getpid(ctx.process) as isize)
    }

    fn name(&self) -> &str {
        "getpid"
    }

    fn id(&self) -> SyscallNumber {
        SYS_GETPID
    }
}
