//! File system collaborator interfaces

pub mod interface;

pub use interface::*;
