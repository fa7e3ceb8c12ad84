//! Project configuration
//!
//! Loads `fxforge.toml` from the project root. Unknown keys are collected as
//! non-fatal warnings, and a small set of `FXFORGE_*` environment variables
//! can override the file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ForgeError, ForgeResult};

/// Name of the project configuration file
pub const CONFIG_FILE: &str = "fxforge.toml";

/// Non-fatal configuration warning surfaced to CLI users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub key: String,
    pub file: PathBuf,
}

/// Build directory and mode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSection {
    /// Source tree containing resource directories
    #[serde(default = "default_source")]
    pub source: PathBuf,

    /// Output tree for built resources
    #[serde(default = "default_dist")]
    pub dist: PathBuf,

    /// Scratch directory for the checksum store and per-resource build caches
    #[serde(default = "default_cache")]
    pub cache: PathBuf,

    /// Merge every environment's scripts into one bundle file
    #[serde(default)]
    pub bundle: bool,

    /// Minify bundled output (forwarded to backends, unused by the core)
    #[serde(default)]
    pub minify: bool,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            source: default_source(),
            dist: default_dist(),
            cache: default_cache(),
            bundle: false,
            minify: false,
        }
    }
}

fn default_source() -> PathBuf {
    PathBuf::from("src")
}

fn default_dist() -> PathBuf {
    PathBuf::from(".dist")
}

fn default_cache() -> PathBuf {
    PathBuf::from(".cache")
}

/// Batched worker configuration
///
/// Accepted so existing configs parse, but the sequential engine is the only
/// implemented mode: `enabled = true` is rejected at validation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkersSection {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for WorkersSection {
    fn default() -> Self {
        Self {
            enabled: false,
            batch_size: default_batch_size(),
        }
    }
}

fn default_batch_size() -> usize {
    5
}

/// Project configuration loaded from `fxforge.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub build: BuildSection,

    /// Global environment map, overridden per resource by `manifest.yaml` `env`
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub workers: WorkersSection,
}

impl Config {
    /// Load configuration from a file, collecting unknown-key warnings.
    pub fn load(path: &Path) -> ForgeResult<(Self, Vec<ConfigWarning>)> {
        let content = fs::read_to_string(path)?;

        let mut unknown_paths: Vec<String> = Vec::new();
        let deserializer = toml::de::Deserializer::new(&content);

        let config: Config = serde_ignored::deserialize(deserializer, |p| {
            unknown_paths.push(p.to_string());
        })
        .map_err(|e| ForgeError::InvalidConfig {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        config.validate(path)?;

        let warnings = unknown_paths
            .into_iter()
            .map(|key| ConfigWarning {
                key,
                file: path.to_path_buf(),
            })
            .collect();

        Ok((config, warnings))
    }

    /// Load `fxforge.toml` from the project root, or fall back to defaults.
    /// Relative build directories are anchored at the project root.
    pub fn load_or_default(project_root: &Path) -> ForgeResult<(Self, Vec<ConfigWarning>)> {
        let path = project_root.join(CONFIG_FILE);
        let (config, warnings) = if path.exists() {
            Self::load(&path)?
        } else {
            (Self::default(), Vec::new())
        };
        Ok((config.with_env_overrides().anchored_at(project_root), warnings))
    }

    fn anchored_at(mut self, root: &Path) -> Self {
        for dir in [
            &mut self.build.source,
            &mut self.build.dist,
            &mut self.build.cache,
        ] {
            if dir.is_relative() {
                *dir = root.join(&dir);
            }
        }
        self
    }

    /// Apply `FXFORGE_*` environment variable overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("FXFORGE_BUNDLE") {
            self.build.bundle = val.to_lowercase() != "false" && val != "0";
        }
        if let Ok(val) = std::env::var("FXFORGE_MINIFY") {
            self.build.minify = val.to_lowercase() != "false" && val != "0";
        }
        if let Ok(dist) = std::env::var("FXFORGE_DIST") {
            if !dist.is_empty() {
                self.build.dist = PathBuf::from(dist);
            }
        }
        self
    }

    fn validate(&self, path: &Path) -> ForgeResult<()> {
        if self.workers.enabled {
            return Err(ForgeError::InvalidConfig {
                path: path.to_path_buf(),
                message: "workers.enabled is not supported; builds run sequentially".to_string(),
            });
        }
        if self.workers.batch_size == 0 {
            return Err(ForgeError::InvalidConfig {
                path: path.to_path_buf(),
                message: "workers.batch_size must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Root of the built resource tree (`<dist>/server-data/resources`)
    pub fn resources_dist(&self) -> PathBuf {
        self.build.dist.join("server-data").join("resources")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn defaults_without_file_anchor_at_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let (config, warnings) = Config::load_or_default(dir.path()).unwrap();
        assert_eq!(config.build.source, dir.path().join("src"));
        assert_eq!(config.build.dist, dir.path().join(".dist"));
        assert!(!config.build.bundle);
        assert!(warnings.is_empty());
    }

    #[test]
    fn loads_build_section_and_env() {
        let (_dir, path) = write_config(
            r#"
[build]
dist = "out"
bundle = true

[env]
SHARED_API_URL = "https://api.example.test"
"#,
        );
        let (config, warnings) = Config::load(&path).unwrap();
        assert_eq!(config.build.dist, PathBuf::from("out"));
        assert!(config.build.bundle);
        assert_eq!(
            config.env.get("SHARED_API_URL").map(String::as_str),
            Some("https://api.example.test")
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn unknown_keys_warn_but_load() {
        let (_dir, path) = write_config(
            r#"
[build]
bundel = true
"#,
        );
        let (config, warnings) = Config::load(&path).unwrap();
        assert!(!config.build.bundle);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].key, "build.bundel");
    }

    #[test]
    fn workers_enabled_is_rejected() {
        let (_dir, path) = write_config(
            r#"
[workers]
enabled = true
"#,
        );
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("workers.enabled"));
    }

    #[test]
    fn resources_dist_nests_under_server_data() {
        let config = Config::default();
        assert_eq!(
            config.resources_dist(),
            PathBuf::from(".dist/server-data/resources")
        );
    }
}
