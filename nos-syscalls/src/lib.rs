//! NOS System Calls
//!
//! The raw system call boundary of the NOS process subsystem. A trap frame
//! comes in; the dispatcher looks up the handler for its syscall number,
//! the handler decodes the argument registers and copies data across the
//! user boundary through the caller's address space, and the outcome is
//! written back into the frame.
//!
//! # Architecture
//!
//! - **Core**: the dispatcher, handler trait and statistics
//! - **FS**: `open`, `close`, `read`, `write`, `lseek`, `dup2`, `chdir`, `__getcwd`
//! - **Process**: `fork`, `execv`, `waitpid`, `_exit`, `getpid`
//! - **Common**: user memory access
//!
//! # Usage
//!
//! ```rust,ignore
//! use nos_syscalls::{SyscallDispatcher, SYS_GETPID};
//!
//! let dispatcher = SyscallDispatcher::with_default_handlers();
//! let mut frame = TrapFrame::for_syscall(SYS_GETPID, &[]);
//! let result = dispatcher.dispatch(&kernel, &process, &mut frame);
//! ```

#![no_std]

extern crate alloc;

pub mod logging;

pub mod common;
pub mod core;
pub mod fs;
pub mod process;
pub mod types;

pub use crate::core::{SyscallContext, SyscallDispatcher, SyscallHandler, SyscallStats};
pub use types::*;
