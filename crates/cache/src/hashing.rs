use memoexec_core::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const READ_BUFFER_SIZE: usize = 8192;

/// Content hasher for generating fingerprints
///
/// Every input is folded in as a tagged JSON record, so two different input
/// sequences can never concatenate to the same byte stream.
#[derive(Debug)]
pub struct ContentHasher {
    /// Label for debugging purposes
    pub label: String,
    hasher: Sha256,
    /// Metadata about what was hashed
    pub manifest: HashManifest,
}

/// Manifest containing metadata about what was hashed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashManifest {
    pub label: String,
    /// Kinds of the records folded in, in order
    pub inputs: Vec<String>,
    /// File label to content digest
    pub files: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct Record<'a, T: Serialize> {
    kind: &'a str,
    value: T,
}

impl ContentHasher {
    /// Create a new content hasher with a label
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            hasher: Sha256::new(),
            manifest: HashManifest {
                label: label.to_string(),
                inputs: Vec::new(),
                files: BTreeMap::new(),
            },
        }
    }

    /// Hash arbitrary serializable content under `kind`
    pub fn hash_content<T: Serialize>(&mut self, kind: &str, content: T) -> Result<()> {
        self.update_record(kind, content)?;
        self.manifest.inputs.push(kind.to_string());
        Ok(())
    }

    /// Hash a file's content, recording it under `label`
    pub fn hash_file(&mut self, label: &str, file_path: &Path) -> Result<String> {
        let digest = file_digest(file_path)?;
        self.update_record("file", (label, &digest))?;
        self.manifest.inputs.push(format!("file:{label}"));
        self.manifest.files.insert(label.to_string(), digest.clone());
        Ok(digest)
    }

    /// Hash every regular file below `dir` as (relative path, content) pairs,
    /// skipping anything under `ignored`
    pub fn hash_directory(&mut self, label: &str, dir: &Path, ignored: &[PathBuf]) -> Result<()> {
        let files = collect_files(dir, ignored)?;
        log::debug!(
            "Hashing directory {dir:?} as '{label}': {} file(s)",
            files.len()
        );

        self.update_record("directory", (label, files.len()))?;
        self.manifest.inputs.push(format!("directory:{label}"));

        for (relative, path) in files {
            let digest = file_digest(&path)?;
            self.update_record("entry", (&relative, &digest))?;
            self.manifest
                .files
                .insert(format!("{label}/{relative}"), digest);
        }
        Ok(())
    }

    /// Generate the final hash and reset the hasher
    pub fn finalize(&mut self) -> String {
        let result = self.hasher.finalize_reset();
        format!("{result:x}")
    }

    /// Serialize the manifest for storage
    pub fn serialize(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.manifest)
            .map_err(|e| Error::json("Failed to serialize hash manifest", e))
    }

    pub fn into_manifest(self) -> HashManifest {
        self.manifest
    }

    fn update_record<T: Serialize>(&mut self, kind: &str, value: T) -> Result<()> {
        let serialized = serde_json::to_vec(&Record { kind, value })
            .map_err(|e| Error::json("Failed to serialize content for hashing", e))?;
        self.hasher.update(&serialized);
        self.hasher.update(b"\n");
        Ok(())
    }
}

/// SHA-256 of a file's content, streamed in fixed-size chunks
pub fn file_digest(file_path: &Path) -> Result<String> {
    let file = fs::File::open(file_path)
        .map_err(|e| Error::file_system(file_path, "open file for hashing", e))?;

    let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);
    let mut file_hasher = Sha256::new();
    let mut buffer = [0u8; READ_BUFFER_SIZE];

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| Error::file_system(file_path, "read file chunk for hashing", e))?;

        if bytes_read == 0 {
            break;
        }
        file_hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", file_hasher.finalize()))
}

/// Whether `path` is one of `ignored` or lies below one of them
pub fn is_ignored(path: &Path, ignored: &[PathBuf]) -> bool {
    ignored.iter().any(|ignore| path.starts_with(ignore))
}

/// Recursively collect regular files below `dir`, sorted by relative path.
///
/// Relative paths use `/` separators on every platform. Symlinks are not
/// followed, so a linked directory contributes nothing and a linked file is
/// skipped.
pub fn collect_files(dir: &Path, ignored: &[PathBuf]) -> Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();

    let walker = WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_ignored(entry.path(), ignored));

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
            let source = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
            Error::file_system(path, "walk directory", source)
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let relative = match entry.path().strip_prefix(dir) {
            Ok(relative) => relative_key(relative),
            Err(_) => {
                log::debug!("Skipping entry outside walked directory: {:?}", entry.path());
                continue;
            }
        };
        files.push((relative, entry.into_path()));
    }

    // sort_by_file_name orders siblings; sort again so nesting cannot
    // interleave differently from a flat ordering of the keys
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

fn relative_key(relative: &Path) -> String {
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
