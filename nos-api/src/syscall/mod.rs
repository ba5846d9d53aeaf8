//! System call interface types

pub mod types;

pub use types::*;
