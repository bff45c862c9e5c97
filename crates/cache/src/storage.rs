//! On-disk entry store.
//!
//! Layout: `<root>/<digest>/result.json` plus `manifest.json` describing what
//! was hashed. `result.json` is written last and atomically, so a reader
//! either finds no entry or a complete one.

use crate::entry::CacheEntry;
use crate::hashing::HashManifest;
use crate::keys::Fingerprint;
use memoexec_core::{Error, Result, CACHE_MANIFEST_FILENAME, CACHE_RESULT_FILENAME};
use memoexec_utils::atomic_file::{remove_dir_if_exists, write_atomic_string};
use std::fs;
use std::path::{Path, PathBuf};

/// Filesystem-backed map from fingerprint to [`CacheEntry`]
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the entry for `fingerprint`
    pub fn entry_dir(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.root.join(fingerprint.digest())
    }

    pub fn result_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.entry_dir(fingerprint).join(CACHE_RESULT_FILENAME)
    }

    pub fn manifest_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.entry_dir(fingerprint).join(CACHE_MANIFEST_FILENAME)
    }

    /// Load the entry for `fingerprint`.
    ///
    /// Missing, unreadable, undecodable and mismatched entries all come back
    /// as `None`; only the latter three are logged.
    pub fn load(&self, fingerprint: &Fingerprint) -> Option<CacheEntry> {
        let path = self.result_path(fingerprint);
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable cache entry, treating as miss");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&data) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "corrupt cache entry, treating as miss");
                return None;
            }
        };

        if !entry.is_current_version() {
            tracing::warn!(
                path = %path.display(),
                version = entry.version,
                "cache entry from another layout version, treating as miss"
            );
            return None;
        }
        if entry.fingerprint != *fingerprint {
            tracing::warn!(
                path = %path.display(),
                stored = %entry.fingerprint,
                "cache entry fingerprint does not match its location, treating as miss"
            );
            return None;
        }

        Some(entry)
    }

    /// Persist `entry` with its hash manifest and return the entry directory
    pub fn save(&self, entry: &CacheEntry, manifest: &HashManifest) -> Result<PathBuf> {
        let dir = self.entry_dir(&entry.fingerprint);
        fs::create_dir_all(&dir).map_err(|e| Error::file_system(&dir, "create entry directory", e))?;

        let manifest_json = serde_json::to_string_pretty(manifest)
            .map_err(|e| Error::json("Failed to serialize hash manifest", e))?;
        write_atomic_string(&dir.join(CACHE_MANIFEST_FILENAME), &manifest_json)?;

        let entry_json = serde_json::to_string_pretty(entry)
            .map_err(|e| Error::json("Failed to serialize cache entry", e))?;
        write_atomic_string(&dir.join(CACHE_RESULT_FILENAME), &entry_json)?;

        tracing::debug!(dir = %dir.display(), "stored cache entry");
        Ok(dir)
    }

    /// Delete the entry for `fingerprint`; returns whether one existed
    pub fn remove(&self, fingerprint: &Fingerprint) -> Result<bool> {
        remove_dir_if_exists(&self.entry_dir(fingerprint))
    }

    /// Delete every entry under the root and return how many were removed.
    ///
    /// Only directories named like a digest are touched, so pointing the
    /// store at a shared directory never removes unrelated content.
    pub fn clear(&self) -> Result<usize> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(Error::file_system(&self.root, "read cache directory", e)),
        };

        let mut removed = 0;
        for entry in entries {
            let entry =
                entry.map_err(|e| Error::file_system(&self.root, "read cache directory entry", e))?;
            let name = entry.file_name();
            let is_entry_dir = name.to_str().is_some_and(Fingerprint::is_digest)
                && entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if is_entry_dir && remove_dir_if_exists(&entry.path())? {
                removed += 1;
            }
        }

        tracing::info!(root = %self.root.display(), removed, "cleared cache");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memoexec_core::{ExecutionResult, Invocation};
    use tempfile::TempDir;

    fn sample(digest_byte: &str) -> (CacheEntry, HashManifest) {
        let invocation = Invocation::builder("echo").arg("hi").build();
        let entry = CacheEntry::new(
            Fingerprint::from_digest(digest_byte.repeat(64)),
            &invocation,
            ExecutionResult::new(0, "hi\n", ""),
        );
        (entry, HashManifest::default())
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        let (entry, manifest) = sample("a");

        let entry_dir = store.save(&entry, &manifest).unwrap();
        assert_eq!(entry_dir, dir.path().join("a".repeat(64)));
        assert!(entry_dir.join(CACHE_RESULT_FILENAME).is_file());
        assert!(entry_dir.join(CACHE_MANIFEST_FILENAME).is_file());

        assert_eq!(store.load(&entry.fingerprint), Some(entry));
    }

    #[test]
    fn test_missing_entry_is_none() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        assert!(store.load(&Fingerprint::from_digest("b".repeat(64))).is_none());
    }

    #[test]
    fn test_corrupt_entry_is_none() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        let (entry, manifest) = sample("c");
        store.save(&entry, &manifest).unwrap();

        fs::write(store.result_path(&entry.fingerprint), "{ not json").unwrap();
        assert!(store.load(&entry.fingerprint).is_none());
    }

    #[test]
    fn test_misplaced_entry_is_none() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        let (entry, manifest) = sample("d");
        store.save(&entry, &manifest).unwrap();

        let other = Fingerprint::from_digest("e".repeat(64));
        fs::create_dir_all(store.entry_dir(&other)).unwrap();
        fs::copy(
            store.result_path(&entry.fingerprint),
            store.result_path(&other),
        )
        .unwrap();
        assert!(store.load(&other).is_none());
    }

    #[test]
    fn test_remove() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        let (entry, manifest) = sample("f");
        store.save(&entry, &manifest).unwrap();

        assert!(store.remove(&entry.fingerprint).unwrap());
        assert!(!store.remove(&entry.fingerprint).unwrap());
        assert!(store.load(&entry.fingerprint).is_none());
    }

    #[test]
    fn test_clear_only_touches_entry_dirs() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        for byte in ["1", "2", "3"] {
            let (entry, manifest) = sample(byte);
            store.save(&entry, &manifest).unwrap();
        }
        fs::create_dir_all(dir.path().join("unrelated")).unwrap();
        fs::write(dir.path().join("notes.txt"), "keep me").unwrap();

        assert_eq!(store.clear().unwrap(), 3);
        assert!(dir.path().join("unrelated").is_dir());
        assert!(dir.path().join("notes.txt").is_file());
        assert_eq!(store.clear().unwrap(), 0);
    }

    #[test]
    fn test_clear_missing_root() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path().join("never-created"));
        assert_eq!(store.clear().unwrap(), 0);
    }
}
