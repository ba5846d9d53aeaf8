//! Process management types

use crate::core::types::VirtAddr;
use crate::syscall::SyscallResult;

/// Number of syscall argument registers preserved in a trap frame.
pub const SYSCALL_ARG_REGS: usize = 6;

/// User register state saved on entry to the kernel.
///
/// Only the registers the process subsystem reads or rewrites are modelled:
/// the syscall number, its arguments, the two result registers and the
/// program counter / stack pointer.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrapFrame {
    /// Syscall number on entry
    pub syscall: usize,
    /// Syscall arguments on entry
    pub args: [usize; SYSCALL_ARG_REGS],
    /// Return value, or errno when `err` is set
    pub ret: usize,
    /// Non-zero when the syscall failed
    pub err: usize,
    /// Program counter of the trapping instruction
    pub pc: VirtAddr,
    /// User stack pointer
    pub sp: VirtAddr,
}

impl TrapFrame {
    /// Width of the syscall instruction.
    pub const SYSCALL_INSN_LEN: usize = 4;

    /// Frame for invoking syscall `number` with `args`.
    pub fn for_syscall(number: usize, args: &[usize]) -> Self {
        let mut frame = TrapFrame {
            syscall: number,
            ..Default::default()
        };
        for (slot, value) in frame.args.iter_mut().zip(args) {
            *slot = *value;
        }
        frame
    }

    /// Step past the syscall instruction so the thread does not re-execute it.
    pub fn advance_pc(&mut self) {
        self.pc = self.pc.wrapping_add(Self::SYSCALL_INSN_LEN);
    }

    /// Encode a syscall outcome into the result registers.
    pub fn set_result(&mut self, result: SyscallResult) {
        match result {
            SyscallResult::Success(value) => {
                self.ret = value as usize;
                self.err = 0;
            }
            SyscallResult::Error(errno) => {
                self.ret = errno as usize;
                self.err = 1;
            }
        }
    }

    /// Decode the result registers written by [`TrapFrame::set_result`].
    pub fn result(&self) -> SyscallResult {
        if self.err != 0 {
            SyscallResult::Error(self.ret as i32)
        } else {
            SyscallResult::Success(self.ret as isize)
        }
    }

    /// The frame a forked child resumes with: return value 0, no error,
    /// past the syscall instruction.
    pub fn fork_child(&self) -> Self {
        let mut child = *self;
        child.ret = 0;
        child.err = 0;
        child.advance_pc();
        child
    }
}
