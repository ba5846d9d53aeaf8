//! Common system call utilities
//!
//! Copies between kernel buffers and the calling process's user memory.
//! Every access goes through the process's address space; a null pointer,
//! a missing address space or a failed copy is reported as `Fault`.

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::mem::size_of;

use nos_api::{Error, PATH_MAX, Result, VirtAddr};
use nos_process::Process;

/// Largest kernel buffer a single user transfer step allocates.
pub const USER_CHUNK: usize = 4096;

fn check_user_ptr(addr: VirtAddr) -> Result<()> {
    if addr == 0 {
        return Err(Error::Fault);
    }
    Ok(())
}

/// Check that `[addr, addr + len)` is mapped in the caller, and writable
/// when `write` is set.
pub fn check_user_range(process: &Process, addr: VirtAddr, len: usize, write: bool) -> Result<()> {
    check_user_ptr(addr)?;
    let space = process.addrspace();
    space.as_ref().ok_or(Error::Fault)?.check_range(addr, len, write)
}

/// Copy `len` bytes from user address `src`.
///
/// The range is checked before anything is allocated.
pub fn copy_from_user(process: &Process, src: VirtAddr, len: usize) -> Result<Vec<u8>> {
    check_user_ptr(src)?;
    let space = process.addrspace();
    let space = space.as_ref().ok_or(Error::Fault)?;
    space.check_range(src, len, false)?;
    let mut bytes = vec![0u8; len];
    space.copyin(src, &mut bytes)?;
    Ok(bytes)
}

/// Copy `bytes` to user address `dst`.
pub fn copy_to_user(process: &Process, dst: VirtAddr, bytes: &[u8]) -> Result<()> {
    check_user_ptr(dst)?;
    let mut space = process.addrspace();
    space.as_mut().ok_or(Error::Fault)?.copyout(bytes, dst)
}

/// Read one pointer-sized word from user memory.
pub fn copy_word_from_user(process: &Process, src: VirtAddr) -> Result<usize> {
    let bytes = copy_from_user(process, src, size_of::<usize>())?;
    let mut word = [0u8; size_of::<usize>()];
    word.copy_from_slice(&bytes);
    Ok(usize::from_ne_bytes(word))
}

/// Write a 32-bit status word to user memory.
pub fn copy_i32_to_user(process: &Process, dst: VirtAddr, value: i32) -> Result<()> {
    copy_to_user(process, dst, &value.to_ne_bytes())
}

/// Copy a NUL-terminated string of at most `max_len` bytes (terminator
/// included) from user memory.
///
/// Returns `None` when no terminator is found within `max_len` bytes.
pub fn copy_cstr_from_user(
    process: &Process,
    src: VirtAddr,
    max_len: usize,
) -> Result<Option<String>> {
    check_user_ptr(src)?;
    let space = process.addrspace();
    let space = space.as_ref().ok_or(Error::Fault)?;

    let mut bytes = Vec::new();
    let mut byte = [0u8; 1];
    for index in 0..max_len {
        let addr = src.checked_add(index).ok_or(Error::Fault)?;
        space.copyin(addr, &mut byte)?;
        if byte[0] == 0 {
            return String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| Error::InvalidArgument);
        }
        bytes.push(byte[0]);
    }
    Ok(None)
}

/// Copy a path argument, failing with `NameTooLong` when it does not fit
/// in `PATH_MAX` bytes.
pub fn copy_path_from_user(process: &Process, src: VirtAddr) -> Result<String> {
    copy_cstr_from_user(process, src, PATH_MAX)?.ok_or(Error::NameTooLong)
}

/// Copy a NULL-terminated `argv` array and its strings.
///
/// At most `arg_max` entries and `arg_max` bytes of strings (terminators
/// included) are accepted; anything larger fails with `ArgListTooBig`.
pub fn copy_argv_from_user(process: &Process, argv: VirtAddr, arg_max: usize) -> Result<Vec<String>> {
    check_user_ptr(argv)?;
    let mut args = Vec::new();
    let mut budget = arg_max;

    for index in 0usize.. {
        let slot = index
            .checked_mul(size_of::<usize>())
            .and_then(|offset| argv.checked_add(offset))
            .ok_or(Error::Fault)?;
        let ptr = copy_word_from_user(process, slot)?;
        if ptr == 0 {
            break;
        }
        if args.len() == arg_max {
            return Err(Error::ArgListTooBig);
        }
        let arg = copy_cstr_from_user(process, ptr, budget)?.ok_or(Error::ArgListTooBig)?;
        budget -= arg.len() + 1;
        args.push(arg);
    }
    Ok(args)
}
