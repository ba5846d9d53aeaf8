//! Path resolution against a process's working directory

use alloc::string::String;
use alloc::vec::Vec;

use nos_api::{Error, Result, PATH_MAX};

/// Device names (`con:`, `lhd0:`) are passed to the file system untouched.
pub fn is_device_path(path: &str) -> bool {
    path.contains(':')
}

/// Resolve `path` against `cwd` into the absolute form handed to the VFS.
///
/// Empty paths are `InvalidArgument`; paths that do not fit in `PATH_MAX`
/// (terminator included) are `NameTooLong`. `.` and `..` components are
/// folded; `..` at the root stays at the root.
pub fn resolve(cwd: Option<&str>, path: &str) -> Result<String> {
    if path.is_empty() {
        return Err(Error::InvalidArgument);
    }
    if path.len() >= PATH_MAX {
        return Err(Error::NameTooLong);
    }
    if is_device_path(path) {
        return Ok(String::from(path));
    }

    let mut parts: Vec<&str> = Vec::new();
    if !path.starts_with('/') {
        match cwd {
            Some(base) => parts.extend(base.split('/').filter(|part| !part.is_empty())),
            // No working directory: leave relative paths to the file system.
            None => return Ok(String::from(path)),
        }
    }
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            name => parts.push(name),
        }
    }

    let mut resolved = String::with_capacity(path.len() + 1);
    for part in &parts {
        resolved.push('/');
        resolved.push_str(part);
    }
    if resolved.is_empty() {
        resolved.push('/');
    }
    if resolved.len() >= PATH_MAX {
        return Err(Error::NameTooLong);
    }
    Ok(resolved)
}
