//! Resource manifest model
//!
//! Defines the data structures parsed from each resource's `manifest.yaml`:
//! script lists per environment, static files, exports, hooks, settings and
//! the scalar directives forwarded to the emitted `fxmanifest.lua`.
//!
//! Script and file entries accept either a plain reference string or a table
//! with flags, so both forms deserialize through untagged enums.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ForgeError, ForgeResult};

/// Name of the per-resource manifest file
pub const MANIFEST_FILE: &str = "manifest.yaml";

/// Execution context a script targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScriptEnv {
    Shared,
    #[default]
    Server,
    Client,
}

impl ScriptEnv {
    /// All environments, in resolution order
    pub const ALL: [ScriptEnv; 3] = [ScriptEnv::Shared, ScriptEnv::Server, ScriptEnv::Client];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptEnv::Shared => "shared",
            ScriptEnv::Server => "server",
            ScriptEnv::Client => "client",
        }
    }
}

/// A free-form manifest value (scalar, list or table)
///
/// Rendered into Lua-manifest syntax by the emitter; the variant order
/// matters for untagged deserialization (bool and numbers before string).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManifestValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<ManifestValue>),
    Map(BTreeMap<String, ManifestValue>),
}

impl From<&str> for ManifestValue {
    fn from(s: &str) -> Self {
        ManifestValue::String(s.to_string())
    }
}

/// One entry of a per-environment script list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScriptEntry {
    Reference(String),
    #[serde(rename_all = "camelCase")]
    Detailed {
        src: String,
        #[serde(default)]
        exclude_from_manifest: bool,
    },
}

impl ScriptEntry {
    pub fn src(&self) -> &str {
        match self {
            ScriptEntry::Reference(src) => src,
            ScriptEntry::Detailed { src, .. } => src,
        }
    }

    pub fn exclude_from_manifest(&self) -> bool {
        match self {
            ScriptEntry::Reference(_) => false,
            ScriptEntry::Detailed {
                exclude_from_manifest,
                ..
            } => *exclude_from_manifest,
        }
    }
}

/// One entry of the static files list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileEntry {
    Reference(String),
    #[serde(rename_all = "camelCase")]
    Detailed {
        src: String,
        #[serde(default)]
        server_only: bool,
        #[serde(default)]
        skip_resolve: bool,
        #[serde(default)]
        skip_copy: bool,
        #[serde(default)]
        temporary: bool,
    },
}

impl FileEntry {
    pub fn src(&self) -> &str {
        match self {
            FileEntry::Reference(src) => src,
            FileEntry::Detailed { src, .. } => src,
        }
    }

    pub fn server_only(&self) -> bool {
        matches!(self, FileEntry::Detailed { server_only: true, .. })
    }

    pub fn skip_resolve(&self) -> bool {
        matches!(self, FileEntry::Detailed { skip_resolve: true, .. })
    }

    pub fn skip_copy(&self) -> bool {
        matches!(self, FileEntry::Detailed { skip_copy: true, .. })
    }

    pub fn temporary(&self) -> bool {
        matches!(self, FileEntry::Detailed { temporary: true, .. })
    }
}

/// An exported function, owned by one environment (server when bare)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExportEntry {
    Name(String),
    Detailed {
        function: String,
        #[serde(default)]
        env: ScriptEnv,
    },
}

impl ExportEntry {
    pub fn function(&self) -> &str {
        match self {
            ExportEntry::Name(function) => function,
            ExportEntry::Detailed { function, .. } => function,
        }
    }

    pub fn env(&self) -> ScriptEnv {
        match self {
            ExportEntry::Name(_) => ScriptEnv::Server,
            ExportEntry::Detailed { env, .. } => *env,
        }
    }
}

/// Watcher tuning for one resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WatcherSection {
    /// Gitignore-style pattern for change events to drop, merged with the
    /// resource's `.watcherignore` file
    #[serde(default)]
    pub ignore: Option<String>,
}

/// Declarative descriptor of one resource
///
/// All fields are optional; a missing or malformed manifest degrades to the
/// default (empty) manifest at load time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceManifest {
    pub fx_version: Option<String>,
    pub game: Option<ManifestValue>,
    pub use_fxv2_oal: Option<String>,
    pub lua54: Option<String>,
    pub ui_page: Option<String>,
    pub dependencies: Option<ManifestValue>,
    pub loadscreen: Option<String>,
    pub loadscreen_manual_shutdown: Option<String>,
    pub this_is_a_map: Option<String>,
    pub replace_level_meta: Option<String>,
    pub data_files: Option<ManifestValue>,
    pub server_only: Option<String>,
    pub map: Option<String>,

    /// Free-form metadata, emitted as a header comment block
    pub info: BTreeMap<String, String>,

    /// Per-resource environment overrides
    pub env: BTreeMap<String, String>,

    /// Lifecycle point -> registered hook name
    pub hooks: BTreeMap<String, String>,

    pub shared_scripts: Vec<ScriptEntry>,
    pub server_scripts: Vec<ScriptEntry>,
    pub client_scripts: Vec<ScriptEntry>,

    pub files: Vec<FileEntry>,
    pub exports: Vec<ExportEntry>,

    /// Directive key -> repeated (name, value) tuples
    pub settings: BTreeMap<String, Vec<(String, ManifestValue)>>,

    /// Declared import dependencies, keyed by profile (`__default__` plus
    /// overrides). Informational: the effective import graph is discovered
    /// from `$resource/...` references at resolve time.
    pub import_deps: BTreeMap<String, Vec<String>>,

    pub watcher: WatcherSection,
}

impl ResourceManifest {
    /// Load a manifest from a resource root.
    pub fn load(resource_root: &Path) -> ForgeResult<Self> {
        let path = resource_root.join(MANIFEST_FILE);
        let content = fs::read_to_string(&path).map_err(|e| ForgeError::ManifestLoad {
            path: path.clone(),
            message: e.to_string(),
        })?;

        serde_yaml_ng::from_str(&content).map_err(|e| ForgeError::ManifestLoad {
            path,
            message: e.to_string(),
        })
    }

    /// Script entries declared for one environment
    pub fn scripts(&self, env: ScriptEnv) -> &[ScriptEntry] {
        match env {
            ScriptEnv::Shared => &self.shared_scripts,
            ScriptEnv::Server => &self.server_scripts,
            ScriptEnv::Client => &self.client_scripts,
        }
    }

    /// Drop file entries flagged `temporary` (run after the manifest is emitted)
    pub fn strip_temporary_files(&mut self) {
        self.files.retain(|file| !file.temporary());
    }
}
