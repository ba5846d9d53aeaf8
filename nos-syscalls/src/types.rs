//! System call type definitions
//!
//! This module contains the system call numbers understood by the
//! dispatcher. The numbering follows the classic teaching-kernel ABI so
//! that existing user binaries keep working.

use nos_api::syscall::SyscallNumber;

/// Process system call numbers
pub const SYS_FORK: SyscallNumber = 0;
pub const SYS_EXECV: SyscallNumber = 2;
pub const SYS_EXIT: SyscallNumber = 3;
pub const SYS_WAITPID: SyscallNumber = 4;
pub const SYS_GETPID: SyscallNumber = 5;

/// File system call numbers
pub const SYS_OPEN: SyscallNumber = 45;
pub const SYS_DUP2: SyscallNumber = 48;
pub const SYS_CLOSE: SyscallNumber = 49;
pub const SYS_READ: SyscallNumber = 50;
pub const SYS_WRITE: SyscallNumber = 55;
pub const SYS_LSEEK: SyscallNumber = 59;
pub const SYS_CHDIR: SyscallNumber = 74;
pub const SYS_GETCWD: SyscallNumber = 76;

/// Name of a known system call, for logs and statistics.
pub fn syscall_name(id: SyscallNumber) -> Option<&'static str> {
    let name = match id {
        SYS_FORK => "fork",
        SYS_EXECV => "execv",
        SYS_EXIT => "_exit",
        SYS_WAITPID => "waitpid",
        SYS_GETPID => "getpid",
        SYS_OPEN => "open",
        SYS_DUP2 => "dup2",
        SYS_CLOSE => "close",
        SYS_READ => "read",
        SYS_WRITE => "write",
        SYS_LSEEK => "lseek",
        SYS_CHDIR => "chdir",
        SYS_GETCWD => "__getcwd",
        _ => return None,
    };
    Some(name)
}
