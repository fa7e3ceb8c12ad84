//! Resource registry
//!
//! A resource is a source directory with a `manifest.yaml`. The registry is
//! the single owner of `Resource` instances: one instance per name, created
//! lazily on first reference (discovery scan or cross-import lookup) and
//! kept for the process lifetime. It is an explicit object passed by
//! reference into resolution and build calls - no ambient singletons.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::ForgeResult;
use crate::manifest::{ResourceManifest, MANIFEST_FILE};

/// One deployable unit: source directory + manifest
#[derive(Debug, Clone)]
pub struct Resource {
    name: String,
    root: PathBuf,
    manifest: ResourceManifest,
    env: BTreeMap<String, String>,
    output_target: PathBuf,
}

impl Resource {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest(&self) -> &ResourceManifest {
        &self.manifest
    }

    /// Global env overridden by the manifest's `env` block
    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Root of this resource's built output tree
    pub fn output_target(&self) -> &Path {
        &self.output_target
    }

    /// A `[disabled]` segment anywhere in the root path turns the resource
    /// into a build no-op.
    pub fn is_disabled(&self) -> bool {
        self.root.to_string_lossy().contains("[disabled]")
    }

    pub fn set_manifest(&mut self, manifest: ResourceManifest) {
        self.manifest = manifest;
    }
}

/// Explicit name -> Resource registry
#[derive(Debug)]
pub struct ResourceRegistry {
    source_root: PathBuf,
    resources_dist: PathBuf,
    global_env: BTreeMap<String, String>,
    resources: HashMap<String, Resource>,
    warnings: Vec<String>,
}

impl ResourceRegistry {
    pub fn new(config: &Config) -> Self {
        Self {
            source_root: config.build.source.clone(),
            resources_dist: config.resources_dist(),
            global_env: config.env.clone(),
            resources: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    /// Scan the source tree for resource manifests and instantiate every
    /// resource found. Returns names in discovery order (directory order,
    /// sorted per level for reproducibility).
    pub fn discover(&mut self) -> ForgeResult<Vec<String>> {
        let mut roots = Vec::new();
        if self.source_root.is_dir() {
            collect_manifest_roots(&self.source_root, &mut roots)?;
        }

        let mut names = Vec::new();
        for root in roots {
            let Some(name) = dir_name(&root) else { continue };
            if !self.resources.contains_key(&name) {
                self.insert(&name, &root);
            }
            names.push(name);
        }
        Ok(names)
    }

    /// Look up a resource, creating it lazily by locating its manifest
    /// anywhere under the source tree.
    pub fn obtain(&mut self, name: &str) -> Option<&Resource> {
        if !self.resources.contains_key(name) {
            let root = find_resource_root(&self.source_root, name)?;
            self.insert(name, &root);
        }
        self.resources.get(name)
    }

    pub fn get(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Resource> {
        self.resources.get_mut(name)
    }

    /// Re-read a resource's manifest from disk (watch mode), keeping the
    /// instance identity.
    pub fn reload_manifest(&mut self, name: &str) {
        let Some(resource) = self.resources.get(name) else {
            return;
        };
        let root = resource.root.clone();
        let (manifest, env) = self.load_manifest(name, &root);
        if let Some(resource) = self.resources.get_mut(name) {
            resource.manifest = manifest;
            resource.env = env;
        }
    }

    /// Map a changed file to its owning resource by walking ancestors until
    /// a directory holding a manifest is found. Works for resources that are
    /// not registered yet.
    pub fn resource_for_path(&self, path: &Path) -> Option<(String, PathBuf)> {
        for dir in path.ancestors().skip(1) {
            if dir.join(MANIFEST_FILE).is_file() {
                return dir_name(dir).map(|name| (name, dir.to_path_buf()));
            }
            if dir == self.source_root {
                break;
            }
        }
        None
    }

    /// Drain non-fatal warnings (manifest load failures) collected so far.
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    fn insert(&mut self, name: &str, root: &Path) {
        let (manifest, env) = self.load_manifest(name, root);
        let output_target = self.output_target_for(name, root);

        self.resources.insert(
            name.to_string(),
            Resource {
                name: name.to_string(),
                root: root.to_path_buf(),
                manifest,
                env,
                output_target,
            },
        );
    }

    /// Load the manifest, degrading to the empty default on failure. A
    /// malformed manifest typically yields an empty build, not a crash.
    fn load_manifest(&mut self, name: &str, root: &Path) -> (ResourceManifest, BTreeMap<String, String>) {
        let manifest = match ResourceManifest::load(root) {
            Ok(manifest) => manifest,
            Err(err) => {
                self.warnings
                    .push(format!("resource '{}': {}", name, err));
                ResourceManifest::default()
            }
        };

        let mut env = self.global_env.clone();
        env.extend(manifest.env.clone());

        (manifest, env)
    }

    /// Output tree mirrors the category directories between the source root
    /// and the resource, e.g. `src/[core]/chat` ->
    /// `<dist>/server-data/resources/[core]/chat`.
    fn output_target_for(&self, name: &str, root: &Path) -> PathBuf {
        let category = root
            .parent()
            .and_then(|parent| parent.strip_prefix(&self.source_root).ok())
            .unwrap_or_else(|| Path::new(""));
        self.resources_dist.join(category).join(name)
    }
}

/// Directories holding a manifest, depth first with sorted siblings
fn collect_manifest_roots(dir: &Path, out: &mut Vec<PathBuf>) -> ForgeResult<()> {
    if dir.join(MANIFEST_FILE).is_file() {
        out.push(dir.to_path_buf());
    }

    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    entries.sort();

    for entry in entries {
        collect_manifest_roots(&entry, out)?;
    }
    Ok(())
}

/// Locate `**/<name>/manifest.yaml` under the source tree
fn find_resource_root(source_root: &Path, name: &str) -> Option<PathBuf> {
    let mut roots = Vec::new();
    collect_manifest_roots(source_root, &mut roots).ok()?;
    roots
        .into_iter()
        .find(|root| dir_name(root).as_deref() == Some(name))
}

fn dir_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().to_string())
}
