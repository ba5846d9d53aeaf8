//! Thread collaborator interface
//!
//! The process subsystem never creates or schedules threads itself. Fork
//! hands the child's trap frame to the host, exit asks the host to end the
//! calling thread, and exec asks it to drop into user mode.

use alloc::sync::Arc;

use nos_api::{Result, TrapFrame};

use crate::exec::ExecImage;
use crate::process::Process;

pub trait ThreadHost: Send + Sync {
    /// Start a thread for `process` that resumes user mode at `frame`.
    ///
    /// On error no thread was started.
    fn fork_thread(&self, process: Arc<Process>, frame: TrapFrame) -> Result<()>;

    /// Terminate the calling thread.
    fn exit_thread(&self) -> !;

    /// Enter user mode on the freshly exec'd image.
    fn enter_user(&self, image: ExecImage) -> !;
}
