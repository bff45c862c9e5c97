//! Fingerprints: content-derived identities of invocations

use crate::hashing::{is_ignored, ContentHasher, HashManifest};
use memoexec_core::{Invocation, Result, CACHE_ENTRY_VERSION};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Per-call options of a memoized execution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecuteOptions {
    /// Skip the lookup and replace any stored entry
    pub force_reexecution: bool,
    /// Paths left out of fingerprinting, as arguments or inside walked directories
    pub ignore_paths: Vec<PathBuf>,
    /// Opaque strings folded into the fingerprint in order
    pub extra_invalidation_tokens: Vec<String>,
}

impl ExecuteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn force(mut self, force: bool) -> Self {
        self.force_reexecution = force;
        self
    }

    #[must_use]
    pub fn ignore(mut self, path: impl Into<PathBuf>) -> Self {
        self.ignore_paths.push(path.into());
        self
    }

    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.extra_invalidation_tokens.push(token.into());
        self
    }

    #[must_use]
    pub fn tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_invalidation_tokens
            .extend(tokens.into_iter().map(Into::into));
        self
    }
}

/// Lower-case hex SHA-256 identifying an invocation and its inputs
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint `invocation` under `options`.
    ///
    /// Covers the program and argument vectors, the shell flag, environment
    /// overrides, the canonical location and content of every argument naming
    /// an existing file or directory, and the extra tokens. Verbosity and
    /// modification times are not part of it.
    pub fn compute(
        invocation: &Invocation,
        options: &ExecuteOptions,
    ) -> Result<(Fingerprint, HashManifest)> {
        let base = invocation.working_dir();
        let ignored: Vec<PathBuf> = options
            .ignore_paths
            .iter()
            .map(|path| normalize(&resolve(base, path)))
            .collect();

        let mut hasher = ContentHasher::new(&invocation.display_command());
        hasher.hash_content("version", CACHE_ENTRY_VERSION)?;
        hasher.hash_content("program", invocation.program().words())?;
        hasher.hash_content("arguments", invocation.arguments())?;
        hasher.hash_content("shell", invocation.use_shell())?;
        hasher.hash_content("environment", invocation.environment_overrides())?;

        for argument in invocation.arguments() {
            hash_path_argument(&mut hasher, base, argument, &ignored)?;
        }

        for token in &options.extra_invalidation_tokens {
            hasher.hash_content("token", token)?;
        }

        let digest = hasher.finalize();
        log::debug!(
            "Fingerprint {digest} for '{}' ({} file(s) hashed)",
            hasher.label,
            hasher.manifest.files.len()
        );
        Ok((Fingerprint(digest), hasher.into_manifest()))
    }

    /// Wrap an existing digest, e.g. a directory name found in the store
    pub fn from_digest(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    pub fn digest(&self) -> &str {
        &self.0
    }

    /// Whether `value` has the shape of a digest produced by [`Self::compute`]
    pub fn is_digest(value: &str) -> bool {
        value.len() == 64
            && value
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn hash_path_argument(
    hasher: &mut ContentHasher,
    base: Option<&Path>,
    argument: &str,
    ignored: &[PathBuf],
) -> Result<()> {
    if argument.is_empty() {
        return Ok(());
    }
    let path = resolve(base, Path::new(argument));

    // Anything that is not an existing file or directory is a literal string
    let Ok(metadata) = fs::metadata(&path) else {
        return Ok(());
    };
    let normalized = normalize(&path);
    if is_ignored(&normalized, ignored) {
        log::debug!("Ignoring argument {argument:?} during fingerprinting");
        return Ok(());
    }

    // The same tree at another location is another input
    hasher.hash_content("location", (argument, normalized.to_string_lossy()))?;

    if metadata.is_file() {
        hasher.hash_file(argument, &normalized)?;
    } else if metadata.is_dir() {
        hasher.hash_directory(argument, &normalized, ignored)?;
    }
    Ok(())
}

fn resolve(base: Option<&Path>, path: &Path) -> PathBuf {
    match base {
        Some(base) if path.is_relative() => base.join(path),
        _ => path.to_path_buf(),
    }
}

/// Canonical form used to compare against ignore paths; paths that do not
/// exist are kept as given
fn normalize(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
