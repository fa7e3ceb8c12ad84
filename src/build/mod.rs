//! Build orchestration
//!
//! `BuildEngine` owns the registry, import graph, checksum store, hook table
//! and backend list, and drives each resource through its lifecycle:
//!
//! pre_build hook -> resolve (incremental filter) -> post_resolve hook ->
//! backend dispatch -> post_build hook -> finalize (copy files, emit
//! manifest, drop build cache, strip temporaries) -> finished hook.
//!
//! A disabled resource short-circuits before any of that with a
//! distinguishable non-error outcome. Any other failure is caught at the
//! resource boundary and never aborts the rest of the run.

mod backend;

pub use backend::{
    default_backends, env_suffixed, BackendContext, BuiltScripts, JsBackend, LuaBackend,
    ScriptBackend, ENV_EXPOSED_PREFIXES,
};

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::checksum::ChecksumCache;
use crate::config::Config;
use crate::emit;
use crate::error::{ForgeError, ForgeResult};
use crate::graph::ImportGraph;
use crate::hooks::{HookContext, HookPayload, HookPoint, HookRegistry};
use crate::manifest::{ResourceManifest, ScriptEnv};
use crate::registry::ResourceRegistry;
use crate::resolver::{self, ResolvedItem, ResolvedScripts};

/// Per-run build options
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Rebuild everything, bypassing the checksum decision
    pub force: bool,
    /// Merge each environment's scripts into one bundle file
    pub bundle: bool,
    /// Forwarded to backends
    pub minify: bool,
    /// Re-read the manifest from disk before building (watch mode)
    pub reload_manifest: bool,
}

impl BuildOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            force: false,
            bundle: config.build.bundle,
            minify: config.build.minify,
            reload_manifest: false,
        }
    }
}

/// Terminal outcome of one resource's build
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Built { inclusions: Vec<String> },
    /// Intentionally skipped; not a failure
    Disabled,
    Failed { reason: String },
}

/// Build progress events, NDJSON-serializable for CI
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BuildEvent {
    RunStarted {
        resources: usize,
    },
    ResourceBuilt {
        resource: String,
        inclusions: Vec<String>,
    },
    ResourceDisabled {
        resource: String,
    },
    ResourceFailed {
        resource: String,
        reason: String,
    },
    Warning {
        message: String,
    },
    CachePersisted {
        entries: usize,
    },
}

impl BuildEvent {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Aggregate result of a whole-tree build run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub built: Vec<String>,
    pub disabled: Vec<String>,
    pub failed: Vec<String>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// The build engine: all process-wide build state in one place
pub struct BuildEngine {
    config: Config,
    registry: ResourceRegistry,
    graph: ImportGraph,
    cache: ChecksumCache,
    hooks: HookRegistry,
    backends: Vec<Box<dyn ScriptBackend>>,
}

impl BuildEngine {
    pub fn new(config: Config) -> Self {
        let registry = ResourceRegistry::new(&config);
        let cache = ChecksumCache::load(&config.build.cache);
        Self {
            config,
            registry,
            graph: ImportGraph::new(),
            cache,
            hooks: HookRegistry::new(),
            backends: default_backends(),
        }
    }

    /// Replace the hook table (resolved at configuration time).
    pub fn with_hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = hooks;
        self
    }

    /// Replace the backend list, preserving registration order semantics.
    pub fn with_backends(mut self, backends: Vec<Box<dyn ScriptBackend>>) -> Self {
        self.backends = backends;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn graph(&self) -> &ImportGraph {
        &self.graph
    }

    /// Flush the checksum store; returns the number of entries written.
    pub fn persist_cache(&self) -> ForgeResult<usize> {
        self.cache.persist()?;
        Ok(self.cache.len())
    }

    /// Build every discovered resource in discovery order, then flush the
    /// checksum store once.
    pub fn run(
        &mut self,
        options: &BuildOptions,
        on_event: &dyn Fn(&BuildEvent),
    ) -> ForgeResult<RunSummary> {
        let names = self.registry.discover()?;
        self.drain_warnings(on_event);

        if names.is_empty() {
            return Err(ForgeError::NoResources {
                root: self.registry.source_root().to_path_buf(),
            });
        }

        on_event(&BuildEvent::RunStarted {
            resources: names.len(),
        });

        let mut summary = RunSummary::default();
        for name in &names {
            match self.build_resource(name, options, on_event) {
                BuildOutcome::Built { inclusions } => {
                    on_event(&BuildEvent::ResourceBuilt {
                        resource: name.clone(),
                        inclusions,
                    });
                    summary.built.push(name.clone());
                }
                BuildOutcome::Disabled => {
                    on_event(&BuildEvent::ResourceDisabled {
                        resource: name.clone(),
                    });
                    summary.disabled.push(name.clone());
                }
                BuildOutcome::Failed { reason } => {
                    on_event(&BuildEvent::ResourceFailed {
                        resource: name.clone(),
                        reason,
                    });
                    summary.failed.push(name.clone());
                }
            }
        }

        let entries = self.persist_cache()?;
        on_event(&BuildEvent::CachePersisted { entries });

        Ok(summary)
    }

    /// Build one resource, catching every failure at the resource boundary.
    pub fn build_resource(
        &mut self,
        name: &str,
        options: &BuildOptions,
        on_event: &dyn Fn(&BuildEvent),
    ) -> BuildOutcome {
        match self.try_build(name, options, on_event) {
            Ok(outcome) => outcome,
            Err(err) => BuildOutcome::Failed {
                reason: err.to_string(),
            },
        }
    }

    fn try_build(
        &mut self,
        name: &str,
        options: &BuildOptions,
        on_event: &dyn Fn(&BuildEvent),
    ) -> ForgeResult<BuildOutcome> {
        if options.reload_manifest {
            self.registry.reload_manifest(name);
        }

        let Some(resource) = self.registry.obtain(name) else {
            return Ok(BuildOutcome::Failed {
                reason: format!("resource '{}' not found under the source tree", name),
            });
        };
        let root = resource.root().to_path_buf();
        let output_target = resource.output_target().to_path_buf();
        let env = resource.env().clone();
        let disabled = resource.is_disabled();
        let mut manifest = resource.manifest().clone();

        self.drain_warnings(on_event);

        if disabled {
            return Ok(BuildOutcome::Disabled);
        }

        let (m, _) = self.run_hook(
            HookPoint::PreBuild,
            manifest,
            name,
            &root,
            &output_target,
            HookPayload::None,
            on_event,
        );
        manifest = m;

        // Resolve every declared script reference. Items the checksum store
        // considers unchanged are marked so backends skip recompiling them
        // while the emitted manifest still lists every script. Bundling and
        // force bypass the decision entirely: a merged artifact has no
        // meaningful partial diff.
        let mut resolved = ResolvedScripts::default();
        let mut inclusions: Vec<String> = Vec::new();
        let mut excluded: BTreeSet<PathBuf> = BTreeSet::new();
        let mut unchanged: BTreeSet<PathBuf> = BTreeSet::new();

        for env_kind in ScriptEnv::ALL {
            for entry in manifest.scripts(env_kind) {
                let items =
                    resolver::resolve(&mut self.registry, &mut self.graph, name, entry.src())?;
                for item in items {
                    if item.provider != name && !inclusions.contains(&item.provider) {
                        inclusions.push(item.provider.clone());
                    }

                    if !options.bundle
                        && !options.force
                        && !self.script_needs_build(&item, env_kind)
                    {
                        unchanged.insert(item.target_rel.clone());
                    }
                    if entry.exclude_from_manifest() {
                        excluded.insert(item.target_rel.clone());
                    }
                    resolved.get_mut(env_kind).push(item);
                }
            }
        }

        let (m, payload) = self.run_hook(
            HookPoint::PostResolve,
            manifest,
            name,
            &root,
            &output_target,
            HookPayload::Resolved(resolved),
            on_event,
        );
        manifest = m;
        let resolved = match payload {
            HookPayload::Resolved(scripts) => scripts,
            HookPayload::None => ResolvedScripts::default(),
        };

        // Dispatch to backends in registration order; each sees only the
        // files its classifier claims, and empty partitions are skipped.
        let build_cache = self.config.build.cache.join("build").join(name);
        let ctx = BackendContext {
            resource_name: name.to_string(),
            resource_root: root.clone(),
            output_target: output_target.clone(),
            build_cache: build_cache.clone(),
            env,
            bundle: options.bundle,
            minify: options.minify,
            excluded,
            unchanged,
        };

        let mut built = BuiltScripts::default();
        for backend in &self.backends {
            let partition = resolved.filter(|file_name| backend.classify(file_name));
            if partition.is_empty() {
                continue;
            }
            let output = backend
                .build(&ctx, &partition)
                .map_err(|e| ForgeError::Builder {
                    resource: name.to_string(),
                    backend: backend.name().to_string(),
                    message: e.to_string(),
                })?;
            built.extend(output);
        }

        let (m, _) = self.run_hook(
            HookPoint::PostBuild,
            manifest,
            name,
            &root,
            &output_target,
            HookPayload::None,
            on_event,
        );
        manifest = m;

        self.copy_files(name, &manifest)?;

        let document = emit::render(
            &mut self.registry,
            &mut self.graph,
            name,
            &manifest,
            &built,
            options.bundle,
        )?;
        backend::write_file(&output_target.join(emit::FXMANIFEST_FILE), &document)?;

        let _ = fs::remove_dir_all(&build_cache);
        manifest.strip_temporary_files();

        let (m, _) = self.run_hook(
            HookPoint::Finished,
            manifest,
            name,
            &root,
            &output_target,
            HookPayload::None,
            on_event,
        );
        manifest = m;

        if let Some(resource) = self.registry.get_mut(name) {
            resource.set_manifest(manifest);
        }

        Ok(BuildOutcome::Built { inclusions })
    }

    /// Copy declared static files into the output tree, honoring skip_copy.
    fn copy_files(&mut self, name: &str, manifest: &ResourceManifest) -> ForgeResult<()> {
        for entry in &manifest.files {
            if entry.skip_copy() {
                continue;
            }
            for item in resolver::resolve(&mut self.registry, &mut self.graph, name, entry.src())? {
                if let Some(parent) = item.target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(&item.source, &item.target)?;
            }
        }
        Ok(())
    }

    /// A script needs building when any of its environment-suffixed outputs
    /// is absent, or when the checksum store says its content changed.
    fn script_needs_build(&mut self, item: &ResolvedItem, env: ScriptEnv) -> bool {
        let outputs: Vec<PathBuf> = match env {
            ScriptEnv::Shared => vec![
                env_suffixed(&item.target, ScriptEnv::Server),
                env_suffixed(&item.target, ScriptEnv::Client),
            ],
            other => vec![env_suffixed(&item.target, other)],
        };

        let probe = outputs
            .iter()
            .find(|output| !output.exists())
            .unwrap_or(&outputs[0]);
        self.cache.needs_build(&item.source, probe)
    }

    /// Invoke a hook if the manifest names one; missing or failing hooks are
    /// reported and treated as no-ops. The returned manifest replaces the
    /// in-memory one.
    fn run_hook(
        &self,
        point: HookPoint,
        manifest: ResourceManifest,
        name: &str,
        root: &Path,
        output_target: &Path,
        payload: HookPayload,
        on_event: &dyn Fn(&BuildEvent),
    ) -> (ResourceManifest, HookPayload) {
        let Some(hook_name) = manifest.hooks.get(point.key()).cloned() else {
            return (manifest, payload);
        };

        let context = HookContext {
            resource_name: name.to_string(),
            resource_root: root.to_path_buf(),
            output_target: output_target.to_path_buf(),
            manifest: manifest.clone(),
        };

        match self.hooks.call(&hook_name, context, payload.clone()) {
            None => {
                on_event(&BuildEvent::Warning {
                    message: format!(
                        "hook '{}' ({}) for resource '{}' is not registered",
                        hook_name,
                        point.key(),
                        name
                    ),
                });
                (manifest, payload)
            }
            Some(Err(err)) => {
                on_event(&BuildEvent::Warning {
                    message: format!(
                        "hook '{}' ({}) for resource '{}' failed: {}",
                        hook_name,
                        point.key(),
                        name,
                        err
                    ),
                });
                (manifest, payload)
            }
            Some(Ok(outcome)) => (outcome.context.manifest, outcome.payload),
        }
    }

    fn drain_warnings(&mut self, on_event: &dyn Fn(&BuildEvent)) {
        for message in self.registry.take_warnings() {
            on_event(&BuildEvent::Warning { message });
        }
    }
}
