//! Command execution for memoexec
//!
//! This crate spawns child processes, drains their output streams
//! concurrently, and exposes the result through the synchronous
//! [`CommandExecutor`] trait.

pub mod command_executor;
pub mod runner;

pub use command_executor::*;
pub use runner::{ProcessStreamRunner, RunnerOptions, StreamBuffer, StreamKind};
