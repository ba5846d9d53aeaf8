//! NOS API - Shared types and collaborator interfaces
//!
//! This crate holds the vocabulary shared by the process subsystem and the
//! syscall layer: the error enum and its errno mapping, identifier aliases,
//! open/seek flags, the trap frame, and the traits through which the process
//! subsystem talks to the VM system, the file system and the program loader.
//!
//! # Architecture
//!
//! - **Core**: identifier aliases, limits, open flags and access modes
//! - **Error**: the closed `Error` enum, errno numbers and `Result`
//! - **Memory**: `AddressSpace` and `AddressSpaceFactory`
//! - **Vfs**: `Vnode` and `Vfs`
//! - **Loader**: `ProgramLoader`
//! - **Process**: the user trap frame
//! - **Syscall**: `SyscallNumber` and `SyscallResult`
//!
//! # Usage
//!
//! ```rust
//! use nos_api::error::{Error, Result};
//!
//! fn checked(fd: i32) -> Result<i32> {
//!     if fd < 0 {
//!         return Err(Error::BadDescriptor);
//!     }
//!     Ok(fd)
//! }
//!
//! assert_eq!(checked(-1).unwrap_err().errno(), nos_api::error::EBADF);
//! ```

#![no_std]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

pub mod core;
pub mod error;
pub mod loader;
pub mod memory;
pub mod process;
pub mod sync;
pub mod syscall;
pub mod vfs;

pub use crate::core::types::{
    AccessMode, Fd, Offset, OpenFlags, Pid, VirtAddr, Whence, ARG_MAX, OPEN_MAX, PATH_MAX,
    PID_MAX,
};
pub use error::{Error, Result};
pub use loader::ProgramLoader;
pub use memory::{AddressSpace, AddressSpaceFactory};
pub use process::TrapFrame;
pub use syscall::SyscallResult;
pub use vfs::{Vfs, Vnode};
