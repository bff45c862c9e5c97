//! Memoized command execution
//!
//! [`MemoizationCache`] fingerprints an invocation, serves a stored result
//! when one exists and otherwise delegates to a [`CommandExecutor`] and
//! persists what it returns.

use crate::config::CacheConfig;
use crate::entry::CacheEntry;
use crate::keys::{ExecuteOptions, Fingerprint};
use crate::storage::CacheStore;
use memoexec_core::{ExecutionResult, Invocation, Result, Verbosity};
use memoexec_task::CommandExecutor;
use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};

/// How a result was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Served from a stored entry without spawning
    Hit,
    /// No usable entry; the command ran
    Miss,
    /// Re-execution was requested; any stored entry was discarded
    Forced,
    /// Caching is off; the command ran without fingerprinting
    Bypassed,
}

impl CacheOutcome {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheOutcome::Hit)
    }
}

impl fmt::Display for CacheOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CacheOutcome::Hit => "hit",
            CacheOutcome::Miss => "miss",
            CacheOutcome::Forced => "forced",
            CacheOutcome::Bypassed => "bypassed",
        };
        f.write_str(label)
    }
}

/// Counters of one cache instance
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    errors: AtomicU64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Failed persists; the result was still returned
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    fn record(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Content-addressed memoization in front of a [`CommandExecutor`]
pub struct MemoizationCache<E> {
    executor: E,
    store: CacheStore,
    config: CacheConfig,
    stats: CacheStats,
}

impl<E: CommandExecutor> MemoizationCache<E> {
    pub fn new(executor: E, config: CacheConfig) -> Self {
        Self {
            store: CacheStore::new(&config.base_dir),
            executor,
            config,
            stats: CacheStats::default(),
        }
    }

    /// Cache configured from the environment
    pub fn from_env(executor: E) -> Self {
        Self::new(executor, CacheConfig::from_env())
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Run `invocation`, or return the result of an identical earlier run
    pub fn execute(
        &self,
        invocation: &Invocation,
        options: &ExecuteOptions,
    ) -> Result<ExecutionResult> {
        self.execute_with_outcome(invocation, options)
            .map(|(result, _)| result)
    }

    /// Like [`Self::execute`], also reporting how the result was obtained
    pub fn execute_with_outcome(
        &self,
        invocation: &Invocation,
        options: &ExecuteOptions,
    ) -> Result<(ExecutionResult, CacheOutcome)> {
        let mode = self.config.mode;
        if !mode.is_enabled() {
            tracing::debug!(command = %invocation.display_command(), "cache off, executing directly");
            let result = self.executor.execute(invocation)?;
            return Ok((result, CacheOutcome::Bypassed));
        }

        let (fingerprint, manifest) = Fingerprint::compute(invocation, options)?;
        let command = invocation.display_command();

        let outcome = if options.force_reexecution {
            if mode.is_writable() && self.store.remove(&fingerprint)? {
                tracing::debug!(%fingerprint, "discarded stored entry before forced run");
            }
            CacheOutcome::Forced
        } else {
            if mode.is_readable() {
                if let Some(entry) = self.store.load(&fingerprint) {
                    CacheStats::record(&self.stats.hits);
                    memoexec_utils::tracing::cache_event(&command, fingerprint.digest(), true);
                    if invocation.verbosity() != Verbosity::Silent {
                        reemit_stdout(&entry.result.stdout);
                    }
                    return Ok((entry.result, CacheOutcome::Hit));
                }
            }
            CacheStats::record(&self.stats.misses);
            memoexec_utils::tracing::cache_event(&command, fingerprint.digest(), false);
            CacheOutcome::Miss
        };

        let result = self.executor.execute(invocation)?;

        if mode.is_writable() && (result.success() || self.config.cache_failures) {
            let entry = CacheEntry::new(fingerprint, invocation, result);
            match self.store.save(&entry, &manifest) {
                Ok(_) => CacheStats::record(&self.stats.writes),
                Err(e) => {
                    CacheStats::record(&self.stats.errors);
                    tracing::warn!(error = %e, command = %command, "failed to persist cache entry");
                }
            }
            return Ok((entry.result, outcome));
        }

        if !result.success() {
            tracing::debug!(exit_code = result.exit_code, "not caching failed result");
        }
        Ok((result, outcome))
    }
}

/// Write a stored stdout to our stdout, as a fresh run would have
fn reemit_stdout(stdout: &str) {
    if stdout.is_empty() {
        return;
    }
    let mut out = std::io::stdout().lock();
    if let Err(e) = out.write_all(stdout.as_bytes()).and_then(|()| out.flush()) {
        tracing::debug!(error = %e, "failed to re-emit cached output");
    }
}
