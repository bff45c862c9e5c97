//! Atomic file operations so cache readers never see a half-written entry

use memoexec_core::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Write data to a file atomically by writing a sibling temp file and renaming it
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path.parent().ok_or_else(|| {
        Error::configuration(format!("invalid file path {path:?}: no parent directory"))
    })?;

    fs::create_dir_all(parent)
        .map_err(|e| Error::file_system(parent, "create parent directory", e))?;

    // Same directory as the target so the rename never crosses filesystems
    let mut temp = NamedTempFile::new_in(parent)
        .map_err(|e| Error::file_system(parent, "create temporary file", e))?;

    temp.write_all(content)
        .map_err(|e| Error::file_system(temp.path(), "write to temporary file", e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| Error::file_system(temp.path(), "sync temporary file", e))?;

    // On failure the temp file is removed when the returned handle drops
    temp.persist(path)
        .map_err(|e| Error::file_system(path, "atomic rename", e.error))?;

    Ok(())
}

/// Write string content to a file atomically
pub fn write_atomic_string(path: &Path, content: &str) -> Result<()> {
    write_atomic(path, content.as_bytes())
}

/// Remove a directory tree, treating an already-missing one as success
pub fn remove_dir_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::file_system(path, "remove directory", e)),
    }
}
