//! Process subsystem configuration

use alloc::string::String;

use nos_api::core::types::{ARG_MAX, FIRST_FREE_FD, FIRST_USER_PID, OPEN_MAX, PID_MAX};
use nos_api::{Error, Pid, Result};

/// Sizing and bootstrap parameters for the process subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessConfig {
    /// Highest pid handed out
    pub max_pid: Pid,
    /// Descriptor table capacity of every process
    pub open_max: usize,
    /// Device opened for the standard streams of a spawned program
    pub console_path: String,
    /// Limit on exec argument vectors, in entries and in bytes
    pub arg_max: usize,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            max_pid: PID_MAX,
            open_max: OPEN_MAX,
            console_path: String::from("con:"),
            arg_max: ARG_MAX,
        }
    }
}

impl ProcessConfig {
    /// Reject configurations the tables cannot be built from.
    pub fn validate(&self) -> Result<()> {
        if self.max_pid < FIRST_USER_PID || self.open_max < FIRST_FREE_FD || self.arg_max == 0 {
            return Err(Error::InvalidArgument);
        }
        if self.console_path.is_empty() {
            return Err(Error::InvalidArgument);
        }
        Ok(())
    }
}
