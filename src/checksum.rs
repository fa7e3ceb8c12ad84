//! Persistent checksum store for incremental builds
//!
//! Maps source paths to SHA-256 content hashes. The store is loaded once at
//! startup, mutated in memory while a run decides which files need
//! rebuilding, and flushed to disk exactly once when the run finishes.
//!
//! A "needs rebuild" decision records the fresh hash as a side effect, so an
//! immediately repeated query for an unchanged file answers "no".

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ForgeError, ForgeResult};
use crate::hash::ContentHash;

/// File name of the persisted store, inside the cache directory
pub const CHECKSUM_FILE: &str = "checksums.toml";

/// Normalize a path for store keys (always forward slashes).
fn store_key(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// On-disk representation
#[derive(Debug, Serialize, Deserialize)]
struct ChecksumFile {
    version: u32,
    files: BTreeMap<String, String>,
}

/// In-memory checksum store
#[derive(Debug)]
pub struct ChecksumCache {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl ChecksumCache {
    /// Load the store from the cache directory, or start empty.
    ///
    /// An unreadable or unparsable store file is treated as empty; the worst
    /// outcome is a full rebuild.
    pub fn load(cache_dir: &Path) -> Self {
        let path = cache_dir.join(CHECKSUM_FILE);
        let entries = fs::read_to_string(&path)
            .ok()
            .and_then(|content| toml::from_str::<ChecksumFile>(&content).ok())
            .map(|file| file.files)
            .unwrap_or_default();

        Self { path, entries }
    }

    /// Create an empty store that persists to the given cache directory.
    pub fn empty(cache_dir: &Path) -> Self {
        Self {
            path: cache_dir.join(CHECKSUM_FILE),
            entries: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decide whether `source` must be rebuilt, given its expected `output`.
    ///
    /// True when the output is absent, no hash is stored, or the stored hash
    /// no longer matches the file content. Every true outcome records the
    /// fresh hash.
    pub fn needs_build(&mut self, source: &Path, output: &Path) -> bool {
        let key = store_key(source);

        let fresh = match ContentHash::from_file(source) {
            Ok(hash) => hash,
            // Unreadable source: let the backend surface the real error.
            Err(_) => return true,
        };

        if !output.exists() {
            self.entries.insert(key, fresh.as_str().to_string());
            return true;
        }

        match self.entries.get(&key) {
            Some(stored) if stored == fresh.as_str() => false,
            _ => {
                self.entries.insert(key, fresh.as_str().to_string());
                true
            }
        }
    }

    /// Flush the store to disk. Called once per build run.
    pub fn persist(&self) -> ForgeResult<()> {
        let file = ChecksumFile {
            version: 1,
            files: self.entries.clone(),
        };

        let content = toml::to_string_pretty(&file).map_err(|e| ForgeError::CachePersist {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| ForgeError::CachePersist {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
        }

        fs::write(&self.path, content).map_err(|e| ForgeError::CachePersist {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("main.lua");
        let output = dir.path().join("out").join("main.lua");
        fs::write(&source, "print('hi')").unwrap();
        fs::create_dir_all(output.parent().unwrap()).unwrap();
        fs::write(&output, "built").unwrap();
        (dir, source, output)
    }

    #[test]
    fn first_decision_needs_build_and_records() {
        let (dir, source, output) = fixture();
        let mut cache = ChecksumCache::empty(dir.path());

        assert!(cache.needs_build(&source, &output));
        // Recorded hash makes the immediate repeat a no-op.
        assert!(!cache.needs_build(&source, &output));
    }

    #[test]
    fn content_change_flips_the_decision() {
        let (dir, source, output) = fixture();
        let mut cache = ChecksumCache::empty(dir.path());

        cache.needs_build(&source, &output);
        fs::write(&source, "print('hi!')").unwrap();

        assert!(cache.needs_build(&source, &output));
        assert!(!cache.needs_build(&source, &output));
    }

    #[test]
    fn missing_output_always_needs_build() {
        let (dir, source, output) = fixture();
        let mut cache = ChecksumCache::empty(dir.path());

        cache.needs_build(&source, &output);
        fs::remove_file(&output).unwrap();

        assert!(cache.needs_build(&source, &output));
    }

    #[test]
    fn persist_and_reload_round_trip() {
        let (dir, source, output) = fixture();

        let mut cache = ChecksumCache::empty(dir.path());
        assert!(cache.needs_build(&source, &output));
        cache.persist().unwrap();

        let mut reloaded = ChecksumCache::load(dir.path());
        assert_eq!(reloaded.len(), 1);
        assert!(!reloaded.needs_build(&source, &output));
    }

    #[test]
    fn corrupt_store_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CHECKSUM_FILE), "not [valid toml").unwrap();

        let cache = ChecksumCache::load(dir.path());
        assert!(cache.is_empty());
    }
}
