//! System call types

use crate::error::{Error, Result};

/// System call number
pub type SyscallNumber = usize;

/// System call result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallResult {
    /// Success with return value
    Success(isize),
    /// Error with errno
    Error(i32),
}

impl SyscallResult {
    /// Returns true if result is success
    pub fn is_success(&self) -> bool {
        matches!(self, SyscallResult::Success(_))
    }

    /// Returns the errno, if this is an error
    pub fn errno(&self) -> Option<i32> {
        match self {
            SyscallResult::Error(errno) => Some(*errno),
            SyscallResult::Success(_) => None,
        }
    }

    /// Flatten to the single-register convention: the value on success,
    /// the negated errno on failure.
    pub fn to_isize(&self) -> isize {
        match self {
            SyscallResult::Success(value) => *value,
            SyscallResult::Error(errno) => -(*errno as isize),
        }
    }

    /// Inverse of [`SyscallResult::to_isize`].
    pub fn from_isize(value: isize) -> Self {
        if value < 0 {
            SyscallResult::Error((-value) as i32)
        } else {
            SyscallResult::Success(value)
        }
    }

    /// Back to a typed result; unknown errno numbers are reported as `IoError`.
    pub fn into_result(self) -> Result<isize> {
        match self {
            SyscallResult::Success(value) => Ok(value),
            SyscallResult::Error(errno) => Err(Error::from_errno(errno).unwrap_or(Error::IoError)),
        }
    }
}

impl From<Result<isize>> for SyscallResult {
    fn from(result: Result<isize>) -> Self {
        match result {
            Ok(value) => SyscallResult::Success(value),
            Err(err) => SyscallResult::Error(err.errno()),
        }
    }
}
