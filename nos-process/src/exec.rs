//! Exec argument handling and user stack layout
//!
//! The argument strings are copied to the top of the new user stack, last
//! argument highest, each padded to an 8-byte boundary. Below them sits the
//! `argv` array of user pointers terminated by a null entry, also 8-byte
//! aligned. The final stack pointer is the address of that array.
//!
//! ```text
//!   stack top ─▶ +-----------------+
//!                | "argN-1\0" pad  |
//!                |      ...        |
//!                | "arg0\0"   pad  |
//!                +-----------------+
//!                | NULL            |
//!                | &argN-1         |
//!                |      ...        |
//!   sp, argv ──▶ | &arg0           |
//!                +-----------------+
//! ```

use alloc::string::String;
use alloc::vec::Vec;
use core::mem::size_of;

use nos_api::{AddressSpace, Error, Result, VirtAddr};
use static_assertions::const_assert;

/// Alignment of every block placed on the new stack.
pub const STACK_ALIGN: usize = 8;

const_assert!(STACK_ALIGN.is_power_of_two());
const_assert!(STACK_ALIGN >= size_of::<VirtAddr>());

/// Everything the thread host needs to start the new image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecImage {
    pub entry: VirtAddr,
    pub stack_ptr: VirtAddr,
    pub argc: usize,
    pub argv: VirtAddr,
}

const fn round_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

/// Check an argument vector against `arg_max` (entries and total bytes,
/// terminators included).
pub fn validate_args(argv: &[String], arg_max: usize) -> Result<()> {
    if argv.len() > arg_max {
        return Err(Error::ArgListTooBig);
    }
    let mut total = 0usize;
    for arg in argv {
        if arg.as_bytes().contains(&0) {
            return Err(Error::InvalidArgument);
        }
        total = total.saturating_add(arg.len() + 1);
        if total > arg_max {
            return Err(Error::ArgListTooBig);
        }
    }
    Ok(())
}

/// Copy `argv` onto the stack that ends at `stack_top`.
///
/// Returns the new stack pointer, which is also the user address of the
/// argument pointer array.
pub fn copyout_args(
    space: &mut dyn AddressSpace,
    stack_top: VirtAddr,
    argv: &[String],
) -> Result<VirtAddr> {
    let mut sp = stack_top - stack_top % STACK_ALIGN;
    let mut pointers: Vec<VirtAddr> = Vec::with_capacity(argv.len() + 1);

    for arg in argv.iter().rev() {
        let len = arg.len() + 1;
        sp = sp.checked_sub(round_up(len, STACK_ALIGN)).ok_or(Error::Fault)?;
        let mut bytes = Vec::with_capacity(len);
        bytes.extend_from_slice(arg.as_bytes());
        bytes.push(0);
        space.copyout(&bytes, sp)?;
        pointers.push(sp);
    }
    pointers.reverse();
    pointers.push(0);

    let table_len = pointers.len() * size_of::<VirtAddr>();
    sp = sp.checked_sub(round_up(table_len, STACK_ALIGN)).ok_or(Error::Fault)?;
    let table: Vec<u8> = pointers.iter().flat_map(|ptr| ptr.to_ne_bytes()).collect();
    space.copyout(&table, sp)?;

    Ok(sp)
}
