//! NOS Process - process lifecycle and descriptor tables
//!
//! This crate owns everything the kernel knows about a process apart from
//! its threads and its memory contents:
//!
//! - **FdTable**: the fixed-size per-process descriptor table
//! - **ProcessRegistry**: the pid table, the parent/child graph and the
//!   `Running -> Zombie -> Available` lifecycle
//! - **Kernel**: fork, exec, exit and waitpid orchestration plus the file
//!   syscalls that act on the caller's descriptor table
//!
//! The VM system, the file system, the program loader and the scheduler are
//! reached only through traits (`nos_api::memory`, `nos_api::vfs`,
//! `nos_api::loader` and [`thread::ThreadHost`]).
//!
//! # Usage
//!
//! ```rust,ignore
//! use nos_process::{Kernel, ProcessConfig};
//!
//! let kernel = Kernel::new(ProcessConfig::default(), vfs, vm, loader, threads);
//! let init = kernel.spawn_runprogram("/bin/init")?;
//! let image = kernel.exec(&init, "/bin/init", &["init".into()])?;
//! ```

#![no_std]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

pub mod config;
pub mod exec;
pub mod fdtable;
pub mod kernel;
pub mod path;
pub mod process;
pub mod registry;
pub mod sync;
pub mod thread;

pub use config::ProcessConfig;
pub use exec::ExecImage;
pub use fdtable::{FdEntry, FdTable, NO_FREE_SLOT};
pub use kernel::Kernel;
pub use process::Process;
pub use registry::{ProcState, ProcessRegistry};
pub use thread::ThreadHost;
