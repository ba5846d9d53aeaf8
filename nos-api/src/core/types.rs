//! Identifier aliases, system limits and the flag types shared by the
//! descriptor table and the syscall layer.

use bitflags::bitflags;
use static_assertions::const_assert;

use crate::error::Error;

/// Process identifier
pub type Pid = u32;

/// File descriptor index
pub type Fd = i32;

/// Byte offset into an open file
pub type Offset = i64;

/// User virtual address
pub type VirtAddr = usize;

/// Largest process id handed out; the process table has `PID_MAX + 1` slots.
pub const PID_MAX: Pid = 128;

/// Default descriptor table capacity per process.
pub const OPEN_MAX: usize = 64;

/// Upper bound on the argument vector passed to exec, in entries and in bytes.
pub const ARG_MAX: usize = 64 * 1024;

/// Longest path accepted by the file syscalls, including the terminator.
pub const PATH_MAX: usize = 1024;

/// Pid of the root (kernel) process every orphan is reparented to.
pub const ROOT_PID: Pid = 1;

/// First pid handed to a user process.
pub const FIRST_USER_PID: Pid = 2;

/// Descriptors 0, 1 and 2 are reserved for the standard streams.
pub const STDIN_FILENO: Fd = 0;
pub const STDOUT_FILENO: Fd = 1;
pub const STDERR_FILENO: Fd = 2;

/// First descriptor index handed out by an ordinary open.
pub const FIRST_FREE_FD: usize = 3;

const_assert!(PID_MAX >= FIRST_USER_PID);
const_assert!(OPEN_MAX > FIRST_FREE_FD);
const_assert!(ARG_MAX % 8 == 0);

bitflags! {
    /// Flags passed to `open`.
    ///
    /// The low two bits hold the access mode and are not independent flags;
    /// use [`OpenFlags::access_mode`] to decode them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenFlags: u32 {
        const O_RDONLY = 0;
        const O_WRONLY = 1;
        const O_RDWR = 2;
        const O_CREAT = 4;
        const O_EXCL = 8;
        const O_TRUNC = 16;
        const O_APPEND = 32;
    }
}

/// Mask selecting the access-mode bits of an open flag word.
pub const O_ACCMODE: u32 = 3;

impl OpenFlags {
    /// Decode the access-mode bits into the permission stored in a descriptor.
    ///
    /// Returns `InvalidArgument` for the undefined mode `3` and for `O_EXCL`
    /// without `O_CREAT`.
    pub fn access_mode(self) -> Result<AccessMode, Error> {
        if self.contains(OpenFlags::O_EXCL) && !self.contains(OpenFlags::O_CREAT) {
            return Err(Error::InvalidArgument);
        }
        match self.bits() & O_ACCMODE {
            0 => Ok(AccessMode::READ),
            1 => Ok(AccessMode::WRITE),
            2 => Ok(AccessMode::READ | AccessMode::WRITE),
            _ => Err(Error::InvalidArgument),
        }
    }
}

bitflags! {
    /// Permission recorded in a descriptor slot.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AccessMode: u8 {
        const READ = 1;
        const WRITE = 2;
    }
}

/// Origin for `lseek`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Set = 0,
    Cur = 1,
    End = 2,
}

impl TryFrom<i32> for Whence {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self, Error> {
        match value {
            0 => Ok(Whence::Set),
            1 => Ok(Whence::Cur),
            2 => Ok(Whence::End),
            _ => Err(Error::InvalidArgument),
        }
    }
}
