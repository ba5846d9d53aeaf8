//! Core system call functionality
//!
//! This module provides the dispatcher and the handler trait.

pub mod dispatcher;
pub mod traits;

pub use dispatcher::{SyscallDispatcher, SyscallStats};
pub use traits::{SyscallContext, SyscallHandler};
