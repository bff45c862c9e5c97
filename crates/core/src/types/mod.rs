//! Core domain types for `memoexec`.
//!
//! ## Organization
//!
//! - **`invocation`**: what to run (`Program`, `Invocation`, `Verbosity`)
//! - **`result`**: what came back (`ExecutionResult`)

pub mod invocation;
pub mod result;

// Re-export all public types for convenient access
pub use invocation::*;
pub use result::*;
