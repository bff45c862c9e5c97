//! Persisted cache entries

use crate::keys::Fingerprint;
use chrono::{DateTime, Utc};
use memoexec_core::{ExecutionResult, Invocation, CACHE_ENTRY_VERSION};
use serde::{Deserialize, Serialize};

/// One stored (fingerprint, result) record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Layout version; entries of another version are treated as misses
    pub version: u32,
    pub fingerprint: Fingerprint,
    /// Display form of the command that produced the result
    pub command_line: String,
    pub created_at: DateTime<Utc>,
    pub result: ExecutionResult,
}

impl CacheEntry {
    pub fn new(fingerprint: Fingerprint, invocation: &Invocation, result: ExecutionResult) -> Self {
        Self {
            version: CACHE_ENTRY_VERSION,
            fingerprint,
            command_line: invocation.display_command(),
            created_at: Utc::now(),
            result,
        }
    }

    pub fn is_current_version(&self) -> bool {
        self.version == CACHE_ENTRY_VERSION
    }
}
