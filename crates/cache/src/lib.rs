//! Content-addressed memoization of external commands
//!
//! A [`MemoizationCache`] fingerprints each invocation (command line plus the
//! content of every file or directory argument) and reuses the stored
//! [`ExecutionResult`](memoexec_core::ExecutionResult) of an identical earlier
//! run instead of spawning the command again.

pub mod config;
pub mod entry;
pub mod hashing;
pub mod keys;
pub mod memoize;
pub mod mode;
pub mod revisions;
pub mod storage;

pub use config::CacheConfig;
pub use entry::CacheEntry;
pub use hashing::{ContentHasher, HashManifest};
pub use keys::{ExecuteOptions, Fingerprint};
pub use memoize::{CacheOutcome, CacheStats, MemoizationCache};
pub use mode::{get_cache_mode, CacheMode};
pub use revisions::git_revision_token;
pub use storage::CacheStore;
