//! Error handling for the NOS process subsystem
//!
//! `Error` is a closed set: every failure a process or descriptor operation
//! can report has exactly one variant and exactly one errno number. The
//! syscall layer turns an `Error` into a negative return value with
//! [`Error::errno`] and user-facing test harnesses go back with
//! [`Error::from_errno`].

use core::fmt;

/// Result type used throughout the process subsystem
pub type Result<T> = core::result::Result<T, Error>;

/// Operation not supported / unknown system call
pub const ENOSYS: i32 = 38;
/// No such file or directory
pub const ENOENT: i32 = 2;
/// I/O error
pub const EIO: i32 = 5;
/// Argument list too long
pub const E2BIG: i32 = 7;
/// Bad file descriptor
pub const EBADF: i32 = 9;
/// No child processes
pub const ECHILD: i32 = 10;
/// Too many processes; shares its number with `EAGAIN`
pub const ENPROC: i32 = 11;
/// Out of memory
pub const ENOMEM: i32 = 12;
/// Bad address
pub const EFAULT: i32 = 14;
/// File exists
pub const EEXIST: i32 = 17;
/// Not a directory
pub const ENOTDIR: i32 = 20;
/// Invalid argument
pub const EINVAL: i32 = 22;
/// File table overflow
pub const ENFILE: i32 = 23;
/// Too many open files in this process
pub const EMFILE: i32 = 24;
/// Illegal seek
pub const ESPIPE: i32 = 29;
/// File name too long
pub const ENAMETOOLONG: i32 = 36;

/// Common error type for process and descriptor operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Error {
    /// No free slot left in the caller's descriptor table
    OutOfDescriptors,
    /// No free slot left to duplicate into
    TableFull,
    /// Descriptor out of range, not open, or not open for this access
    BadDescriptor,
    /// Every pid is in use
    TooManyProcesses,
    /// The pid is not a child of the caller
    NoSuchChild,
    /// Malformed argument
    InvalidArgument,
    /// The file does not support seeking
    NotSeekable,
    /// A user pointer could not be read or written
    Fault,
    /// Allocation failed
    OutOfMemory,
    /// Path does not name an existing object
    NotFound,
    /// Device or file system I/O failure
    IoError,
    /// Path exceeds `PATH_MAX`
    NameTooLong,
    /// Argument vector exceeds `ARG_MAX`
    ArgListTooBig,
    /// Unknown system call or unsupported operation
    NotSupported,
    /// Exclusive create of an existing file
    Exists,
    /// A path component is not a directory
    NotDirectory,
}

impl Error {
    /// Classic errno number for this error.
    pub const fn errno(self) -> i32 {
        match self {
            Error::OutOfDescriptors => EMFILE,
            Error::TableFull => ENFILE,
            Error::BadDescriptor => EBADF,
            Error::TooManyProcesses => ENPROC,
            Error::NoSuchChild => ECHILD,
            Error::InvalidArgument => EINVAL,
            Error::NotSeekable => ESPIPE,
            Error::Fault => EFAULT,
            Error::OutOfMemory => ENOMEM,
            Error::NotFound => ENOENT,
            Error::IoError => EIO,
            Error::NameTooLong => ENAMETOOLONG,
            Error::ArgListTooBig => E2BIG,
            Error::NotSupported => ENOSYS,
            Error::Exists => EEXIST,
            Error::NotDirectory => ENOTDIR,
        }
    }

    /// Inverse of [`Error::errno`]; `None` for numbers this subsystem never produces.
    pub const fn from_errno(errno: i32) -> Option<Self> {
        let err = match errno {
            EMFILE => Error::OutOfDescriptors,
            ENFILE => Error::TableFull,
            EBADF => Error::BadDescriptor,
            ENPROC => Error::TooManyProcesses,
            ECHILD => Error::NoSuchChild,
            EINVAL => Error::InvalidArgument,
            ESPIPE => Error::NotSeekable,
            EFAULT => Error::Fault,
            ENOMEM => Error::OutOfMemory,
            ENOENT => Error::NotFound,
            EIO => Error::IoError,
            ENAMETOOLONG => Error::NameTooLong,
            E2BIG => Error::ArgListTooBig,
            ENOSYS => Error::NotSupported,
            EEXIST => Error::Exists,
            ENOTDIR => Error::NotDirectory,
            _ => return None,
        };
        Some(err)
    }

    fn message(self) -> &'static str {
        match self {
            Error::OutOfDescriptors => "too many open files",
            Error::TableFull => "file table full",
            Error::BadDescriptor => "bad file descriptor",
            Error::TooManyProcesses => "too many processes",
            Error::NoSuchChild => "no such child process",
            Error::InvalidArgument => "invalid argument",
            Error::NotSeekable => "illegal seek",
            Error::Fault => "bad address",
            Error::OutOfMemory => "out of memory",
            Error::NotFound => "no such file or directory",
            Error::IoError => "i/o error",
            Error::NameTooLong => "file name too long",
            Error::ArgListTooBig => "argument list too long",
            Error::NotSupported => "function not implemented",
            Error::Exists => "file exists",
            Error::NotDirectory => "not a directory",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (errno {})", self.message(), self.errno())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
