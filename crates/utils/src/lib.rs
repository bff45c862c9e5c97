//! Shared utilities for memoexec
//!
//! Runtime coordination, atomic file writes, XDG paths and tracing setup used
//! by the other crates in the workspace.

pub mod async_runtime;
pub mod atomic_file;
pub mod tracing;
pub mod xdg;

pub use async_runtime::*;
pub use atomic_file::*;
pub use xdg::*;
