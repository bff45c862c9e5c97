//! Core domain types, errors, and constants for `memoexec`.
//!
//! ## Key Components
//!
//! - **`errors`**: the `Error` enum and `Result` alias shared by every crate in
//!   the workspace.
//! - **`types`**: `Invocation`, `Program`, `Verbosity` and `ExecutionResult`.
//! - **`constants`**: environment variable names, file names and defaults.

pub mod constants;
pub mod errors;
pub mod types;

pub use self::{
    constants::*,
    errors::{Error, Result, ResultExt},
    types::*,
};
