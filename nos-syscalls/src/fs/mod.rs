//! File system system calls
//!
//! Argument registers are decoded here; the descriptor semantics live in
//! `nos_process::Kernel`.

use alloc::boxed::Box;
use alloc::vec;

use nos_api::syscall::SyscallNumber;
use nos_api::{Error, Fd, Offset, OpenFlags, PATH_MAX, Result, VirtAddr};

use crate::common::{
    USER_CHUNK, check_user_range, copy_from_user, copy_path_from_user, copy_to_user,
};
use crate::core::dispatcher::SyscallDispatcher;
use crate::core::traits::{SyscallContext, SyscallHandler};
use crate::types::{
    SYS_CHDIR, SYS_CLOSE, SYS_DUP2, SYS_GETCWD, SYS_LSEEK, SYS_OPEN, SYS_READ, SYS_WRITE,
};

/// Register file system system call handlers
pub fn register_handlers(dispatcher: &mut SyscallDispatcher) {
    dispatcher.register_handler(Box::new(OpenHandler));
    dispatcher.register_handler(Box::new(CloseHandler));
    dispatcher.register_handler(Box::new(ReadHandler));
    dispatcher.register_handler(Box::new(WriteHandler));
    dispatcher.register_handler(Box::new(LseekHandler));
    dispatcher.register_handler(Box::new(Dup2Handler));
    dispatcher.register_handler(Box::new(ChdirHandler));
    dispatcher.register_handler(Box::new(GetcwdHandler));
}

fn arg_fd(raw: usize) -> Fd {
    raw as isize as Fd
}

fn arg_len(raw: usize) -> Result<usize> {
    if raw > isize::MAX as usize {
        return Err(Error::InvalidArgument);
    }
    Ok(raw)
}

fn user_at(buf: VirtAddr, done: usize) -> Result<VirtAddr> {
    buf.checked_add(done).ok_or(Error::Fault)
}

/// `open(path, flags, mode)`
pub struct OpenHandler;

impl SyscallHandler for OpenHandler {
    fn execute(&self, ctx: &SyscallContext<'_>, args: &[usize]) -> Result<isize> {
        let path = copy_path_from_user(ctx.process, args[0])?;
        let flags = u32::try_from(args[1])
            .ok()
            .and_then(OpenFlags::from_bits)
            .ok_or(Error::InvalidArgument)?;
        let mode = args[2] as u32;
        let fd = ctx.kernel.open(ctx.process, &path, flags, mode)?;
        Ok(fd as isize)
    }

    fn name(&self) -> &str {
        "open"
    }

    fn id(&self) -> SyscallNumber {
        SYS_OPEN
    }
}

/// `close(fd)`
pub struct CloseHandler;

impl SyscallHandler for CloseHandler {
    fn execute(&self, ctx: &SyscallContext<'_>, args: &[usize]) -> Result<isize> {
        ctx.kernel.close(ctx.process, arg_fd(args[0]))?;
        Ok(0)
    }

    fn name(&self) -> &str {
        "close"
    }

    fn id(&self) -> SyscallNumber {
        SYS_CLOSE
    }
}

/// `read(fd, buf, len)`
///
/// The whole destination is checked before the file is touched, so a bad
/// buffer consumes nothing. Data then moves in `USER_CHUNK` steps until a
/// short read.
pub struct ReadHandler;

impl SyscallHandler for ReadHandler {
    fn execute(&self, ctx: &SyscallContext<'_>, args: &[usize]) -> Result<isize> {
        let (fd, buf, len) = (arg_fd(args[0]), args[1], arg_len(args[2])?);
        check_user_range(ctx.process, buf, len, true)?;

        let mut chunk = vec![0u8; len.min(USER_CHUNK)];
        let mut done = 0;
        loop {
            let want = (len - done).min(USER_CHUNK);
            let count = match ctx.kernel.read(ctx.process, fd, &mut chunk[..want]) {
                Ok(count) => count,
                Err(err) if done == 0 => return Err(err),
                Err(_) => break,
            };
            copy_to_user(ctx.process, user_at(buf, done)?, &chunk[..count])?;
            done += count;
            if count < want || done == len {
                break;
            }
        }
        Ok(done as isize)
    }

    fn name(&self) -> &str {
        "read"
    }

    fn id(&self) -> SyscallNumber {
        SYS_READ
    }
}

/// `write(fd, buf, len)`, moved in `USER_CHUNK` steps until a short write.
pub struct WriteHandler;

impl SyscallHandler for WriteHandler {
    fn execute(&self, ctx: &SyscallContext<'_>, args: &[usize]) -> Result<isize> {
        let (fd, buf, len) = (arg_fd(args[0]), args[1], arg_len(args[2])?);
        check_user_range(ctx.process, buf, len, false)?;

        let mut done = 0;
        loop {
            let want = (len - done).min(USER_CHUNK);
            let bytes = copy_from_user(ctx.process, user_at(buf, done)?, want)?;
            let count = match ctx.kernel.write(ctx.process, fd, &bytes) {
                Ok(count) => count,
                Err(err) if done == 0 => return Err(err),
                Err(_) => break,
            };
            done += count;
            if count < want || done == len {
                break;
            }
        }
        Ok(done as isize)
    }

    fn name(&self) -> &str {
        "write"
    }

    fn id(&self) -> SyscallNumber {
        SYS_WRITE
    }
}

/// `lseek(fd, offset, whence)`
pub struct LseekHandler;

impl SyscallHandler for LseekHandler {
    fn execute(&self, ctx: &SyscallContext<'_>, args: &[usize]) -> Result<isize> {
        let offset = args[1] as isize as Offset;
        let whence = args[2] as isize as i32;
        let position = ctx.kernel.lseek(ctx.process, arg_fd(args[0]), offset, whence)?;
        isize::try_from(position).map_err(|_| Error::InvalidArgument)
    }

    fn name(&self) -> &str {
        "lseek"
    }

    fn id(&self) -> SyscallNumber {
        SYS_LSEEK
    }
}

/// `dup2(old, new)`
pub struct Dup2Handler;

impl SyscallHandler for Dup2Handler {
    fn execute(&self, ctx: &SyscallContext<'_>, args: &[usize]) -> Result<isize> {
        let fd = ctx.kernel.dup2(ctx.process, arg_fd(args[0]), arg_fd(args[1]))?;
        Ok(fd as isize)
    }

    fn name(&self) -> &str {
        "dup2"
    }

    fn id(&self) -> SyscallNumber {
        SYS_DUP2
    }
}

/// `chdir(path)`
pub struct ChdirHandler;

impl SyscallHandler for ChdirHandler {
    fn execute(&self, ctx: &SyscallContext<'_>, args: &[usize]) -> Result<isize> {
        let path = copy_path_from_user(ctx.process, args[0])?;
        ctx.kernel.chdir(ctx.process, &path)?;
        Ok(0)
    }

    fn name(&self) -> &str {
        "chdir"
    }

    fn id(&self) -> SyscallNumber {
        SYS_CHDIR
    }
}

/// `__getcwd(buf, len)`: the path is copied without a terminator and the
/// number of bytes copied is returned.
pub struct GetcwdHandler;

impl SyscallHandler for GetcwdHandler {
    fn execute(&self, ctx: &SyscallContext<'_>, args: &[usize]) -> Result<isize> {
        let (buf, len) = (args[0], arg_len(args[1])?);
        check_user_range(ctx.process, buf, len, true)?;
        let mut bytes = vec![0u8; len.min(PATH_MAX)];
        let count = ctx.kernel.getcwd(ctx.process, &mut bytes)?;
        copy_to_user(ctx.process, buf, &bytes[..count])?;
        Ok(count as isize)
    }

    fn name(&self) -> &str {
        "__getcwd"
    }

    fn id(&self) -> SyscallNumber {
        SYS_GETCWD
    }
}
