//! Cache configuration with environment precedence and validation
use crate::mode::{get_cache_mode, CacheMode};
use memoexec_core::{Error, Result};
use memoexec_utils::xdg::XdgPaths;
use std::path::{Path, PathBuf};

/// Configuration of a memoization cache
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Root directory; one subdirectory per fingerprint
    pub base_dir: PathBuf,
    /// Cache mode (read-only, read-write, etc.)
    pub mode: CacheMode,
    /// Persist results with a nonzero exit code too
    pub cache_failures: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        // Use XDG cache directory which respects XDG_CACHE_HOME
        Self {
            base_dir: XdgPaths::cache_dir(),
            mode: CacheMode::ReadWrite,
            cache_failures: false,
        }
    }
}

impl CacheConfig {
    /// Configuration rooted at `base_dir` with default settings otherwise
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    /// Defaults overridden by `MEMOEXEC_CACHE_DIR` and `MEMOEXEC_CACHE`
    pub fn from_env() -> Self {
        Self {
            base_dir: XdgPaths::memo_cache_root(),
            mode: get_cache_mode(),
            cache_failures: false,
        }
    }

    #[must_use]
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: CacheMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_cache_failures(mut self, cache_failures: bool) -> Self {
        self.cache_failures = cache_failures;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Reject configurations that could never hold an entry
    pub fn validate(&self) -> Result<()> {
        if self.mode.is_enabled() && self.base_dir.as_os_str().is_empty() {
            return Err(Error::configuration(
                "cache directory must not be empty when caching is enabled",
            ));
        }
        if self.base_dir.is_file() {
            return Err(Error::configuration(format!(
                "cache directory {} is an existing file",
                self.base_dir.display()
            )));
        }
        Ok(())
    }
}
