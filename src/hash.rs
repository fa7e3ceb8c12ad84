//! Content hash value object
//!
//! A validated, immutable SHA-256 hash of a file's content, used by the
//! incremental checksum store for change detection.

use std::fmt;
use std::path::Path;

use crate::error::ForgeResult;

/// Content hash value object
///
/// Wraps a SHA-256 hash string with the `sha256:` prefix so stored entries
/// stay self-describing if the algorithm ever changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    /// Prefix for SHA-256 hashes
    pub const PREFIX: &'static str = "sha256:";

    /// Create a new ContentHash from a raw hash string (with or without prefix)
    pub fn new(raw_hash: &str) -> Self {
        if raw_hash.starts_with(Self::PREFIX) {
            Self(raw_hash.to_string())
        } else {
            Self(format!("{}{}", Self::PREFIX, raw_hash))
        }
    }

    /// Compute the SHA-256 of a byte buffer
    pub fn from_bytes(content: &[u8]) -> Self {
        use sha2::{Digest, Sha256};
        let hash = Sha256::digest(content);
        Self(format!("{}{:x}", Self::PREFIX, hash))
    }

    /// Compute the SHA-256 of a file's content
    pub fn from_file(path: &Path) -> ForgeResult<Self> {
        let content = std::fs::read(path)?;
        Ok(Self::from_bytes(&content))
    }

    /// Get the full hash string with prefix
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get just the hex part without prefix
    pub fn hex(&self) -> &str {
        self.0.strip_prefix(Self::PREFIX).unwrap_or(&self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ContentHash {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

impl From<&str> for ContentHash {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for ContentHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_adds_prefix_if_missing() {
        let hash = ContentHash::new("abc123");
        assert_eq!(hash.as_str(), "sha256:abc123");
    }

    #[test]
    fn new_keeps_prefix_if_present() {
        let hash = ContentHash::new("sha256:abc123");
        assert_eq!(hash.as_str(), "sha256:abc123");
    }

    #[test]
    fn from_bytes_computes_sha256() {
        let hash = ContentHash::from_bytes(b"hello");
        assert!(hash.as_str().starts_with("sha256:"));
        assert_eq!(hash.hex().len(), 64); // SHA-256 is 64 hex chars
    }

    #[test]
    fn same_content_same_hash() {
        assert_eq!(
            ContentHash::from_bytes(b"test"),
            ContentHash::from_bytes(b"test")
        );
    }

    #[test]
    fn different_content_different_hash() {
        assert_ne!(
            ContentHash::from_bytes(b"test1"),
            ContentHash::from_bytes(b"test2")
        );
    }

    #[test]
    fn from_file_matches_from_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.lua");
        std::fs::write(&path, "print(1)").unwrap();

        assert_eq!(
            ContentHash::from_file(&path).unwrap(),
            ContentHash::from_bytes(b"print(1)")
        );
    }

    #[test]
    fn display_shows_full_hash() {
        let hash = ContentHash::new("abc123");
        assert_eq!(format!("{}", hash), "sha256:abc123");
    }
}
