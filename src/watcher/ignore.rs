//! Watcher ignore patterns
//!
//! Change events matching a resource's ignore set never schedule a rebuild.
//! Patterns come from a `.watcherignore` file at the resource root plus the
//! optional `watcher.ignore` manifest pattern, with gitignore semantics.

use std::fs;
use std::path::Path;

use ignore::gitignore::{Gitignore, GitignoreBuilder};

/// File holding per-resource watcher ignore patterns
pub const WATCHER_IGNORE_FILE: &str = ".watcherignore";

/// Compiled ignore set for one resource
#[derive(Debug)]
pub struct WatchIgnore {
    matcher: Gitignore,
    pattern_count: usize,
}

impl Default for WatchIgnore {
    fn default() -> Self {
        Self::empty()
    }
}

impl WatchIgnore {
    /// An empty set that matches nothing.
    pub fn empty() -> Self {
        let matcher = GitignoreBuilder::new("")
            .build()
            .unwrap_or_else(|_| Gitignore::empty());
        Self {
            matcher,
            pattern_count: 0,
        }
    }

    /// Load patterns for a resource. The ignore set is advisory, so an
    /// unreadable file or an invalid line is skipped rather than fatal.
    pub fn load(resource_root: &Path, manifest_pattern: Option<&str>) -> Self {
        let mut builder = GitignoreBuilder::new(resource_root);
        let mut pattern_count = 0;

        let ignore_path = resource_root.join(WATCHER_IGNORE_FILE);
        if let Ok(content) = fs::read_to_string(&ignore_path) {
            for line in content.lines() {
                let trimmed = line.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    continue;
                }
                if builder.add_line(Some(ignore_path.clone()), line).is_ok() {
                    pattern_count += 1;
                }
            }
        }

        if let Some(pattern) = manifest_pattern {
            if !pattern.trim().is_empty() && builder.add_line(None, pattern).is_ok() {
                pattern_count += 1;
            }
        }

        match builder.build() {
            Ok(matcher) => Self {
                matcher,
                pattern_count,
            },
            Err(_) => Self::empty(),
        }
    }

    /// Should a change to this path (relative to the resource root) be
    /// dropped?
    pub fn is_ignored(&self, rel_path: &Path, is_dir: bool) -> bool {
        self.matcher
            .matched_path_or_any_parents(rel_path, is_dir)
            .is_ignore()
    }

    pub fn is_empty(&self) -> bool {
        self.pattern_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_matches_nothing() {
        let ignore = WatchIgnore::empty();
        assert!(ignore.is_empty());
        assert!(!ignore.is_ignored(Path::new("client/main.lua"), false));
    }

    #[test]
    fn file_patterns_apply() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(WATCHER_IGNORE_FILE),
            "# editor scratch\n*.tmp\nnode_modules/\n",
        )
        .unwrap();

        let ignore = WatchIgnore::load(dir.path(), None);
        assert!(!ignore.is_empty());
        assert!(ignore.is_ignored(Path::new("client/editor.tmp"), false));
        assert!(ignore.is_ignored(Path::new("node_modules/pkg/index.js"), false));
        assert!(!ignore.is_ignored(Path::new("client/main.lua"), false));
    }

    #[test]
    fn manifest_pattern_is_merged() {
        let dir = tempfile::tempdir().unwrap();
        let ignore = WatchIgnore::load(dir.path(), Some("generated/**"));
        assert!(ignore.is_ignored(Path::new("generated/out.lua"), false));
        assert!(!ignore.is_ignored(Path::new("src/in.lua"), false));
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ignore = WatchIgnore::load(dir.path(), None);
        assert!(ignore.is_empty());
    }
}
