//! Backend builders
//!
//! A backend classifies script files by name and turns the resolved sets
//! into on-disk outputs plus manifest-relative paths. Backends are
//! registered in a fixed, explicit order so dispatch is reproducible.
//!
//! The Lua and JS backends here are the reference text pipeline: run the
//! macro preprocessor with the per-environment header, strip blank lines and
//! write env-suffixed files (or one bundle per environment). Invoking a real
//! compiler or bundler binary stays outside the core; a backend is free to
//! do that internally.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ForgeResult;
use crate::manifest::ScriptEnv;
use crate::preprocess::Preprocessor;
use crate::resolver::{ResolvedItem, ResolvedScripts};

/// Env keys visible to non-server scripts must carry one of these prefixes.
pub const ENV_EXPOSED_PREFIXES: [&str; 2] = ["SHARED_", "CLIENT_"];

/// Per-environment ordered manifest paths produced by the backends
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuiltScripts {
    pub shared: Vec<String>,
    pub server: Vec<String>,
    pub client: Vec<String>,
}

impl BuiltScripts {
    pub fn get(&self, env: ScriptEnv) -> &Vec<String> {
        match env {
            ScriptEnv::Shared => &self.shared,
            ScriptEnv::Server => &self.server,
            ScriptEnv::Client => &self.client,
        }
    }

    pub fn get_mut(&mut self, env: ScriptEnv) -> &mut Vec<String> {
        match env {
            ScriptEnv::Shared => &mut self.shared,
            ScriptEnv::Server => &mut self.server,
            ScriptEnv::Client => &mut self.client,
        }
    }

    /// Append another backend's output, preserving backend order
    pub fn extend(&mut self, other: BuiltScripts) {
        self.shared.extend(other.shared);
        self.server.extend(other.server);
        self.client.extend(other.client);
    }

    pub fn len(&self) -> usize {
        self.shared.len() + self.server.len() + self.client.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything a backend needs to know about the resource being built
#[derive(Debug, Clone)]
pub struct BackendContext {
    pub resource_name: String,
    pub resource_root: PathBuf,
    pub output_target: PathBuf,
    /// Per-resource scratch dir, deleted when the build finalizes
    pub build_cache: PathBuf,
    pub env: BTreeMap<String, String>,
    pub bundle: bool,
    pub minify: bool,
    /// target_rel of entries flagged exclude-from-manifest: compiled, but
    /// never listed
    pub excluded: BTreeSet<PathBuf>,
    /// target_rel of items whose content and outputs are unchanged: listed,
    /// but not recompiled. Always empty in bundling mode.
    pub unchanged: BTreeSet<PathBuf>,
}

/// Contract between the orchestrator and a backend builder
pub trait ScriptBackend {
    fn name(&self) -> &'static str;

    /// Does this backend handle a file with this name?
    fn classify(&self, file_name: &str) -> bool;

    /// Compile the (already resolved, already filtered) sets and return
    /// manifest-relative output paths per environment.
    fn build(&self, ctx: &BackendContext, scripts: &ResolvedScripts) -> ForgeResult<BuiltScripts>;
}

/// The fixed backend registration order used by the orchestrator
pub fn default_backends() -> Vec<Box<dyn ScriptBackend>> {
    vec![Box::new(LuaBackend), Box::new(JsBackend)]
}

/// Lua scripts
pub struct LuaBackend;

impl ScriptBackend for LuaBackend {
    fn name(&self) -> &'static str {
        "lua"
    }

    fn classify(&self, file_name: &str) -> bool {
        file_name.ends_with(".lua")
    }

    fn build(&self, ctx: &BackendContext, scripts: &ResolvedScripts) -> ForgeResult<BuiltScripts> {
        if ctx.bundle {
            build_bundles(ctx, scripts, "lua")
        } else {
            build_separate(ctx, scripts)
        }
    }
}

/// JS/TS scripts
pub struct JsBackend;

impl ScriptBackend for JsBackend {
    fn name(&self) -> &'static str {
        "js"
    }

    fn classify(&self, file_name: &str) -> bool {
        file_name.ends_with(".js") || file_name.ends_with(".ts")
    }

    fn build(&self, ctx: &BackendContext, scripts: &ResolvedScripts) -> ForgeResult<BuiltScripts> {
        if ctx.bundle {
            build_bundles(ctx, scripts, "js")
        } else {
            build_separate(ctx, scripts)
        }
    }
}

/// Suffix a script path with its environment: `foo.lua` -> `foo_server.lua`
pub fn env_suffixed(path: &Path, env: ScriptEnv) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let file_name = match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, env.as_str(), ext.to_string_lossy()),
        None => format!("{}_{}", stem, env.as_str()),
    };
    path.with_file_name(file_name)
}

/// Write a file, creating parent directories as needed
pub(crate) fn write_file(path: &Path, content: &str) -> ForgeResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

fn build_separate(ctx: &BackendContext, scripts: &ResolvedScripts) -> ForgeResult<BuiltScripts> {
    let mut built = BuiltScripts::default();

    for env in [ScriptEnv::Server, ScriptEnv::Client] {
        for item in scripts.shared.iter().chain(scripts.get(env)) {
            // Unchanged items keep their existing outputs; they are still
            // listed so the emitted manifest stays complete.
            if !ctx.unchanged.contains(&item.target_rel) {
                let content = process_source(ctx, env, item)?;
                write_file(&env_suffixed(&item.target, env), &content)?;
            }

            if !ctx.excluded.contains(&item.target_rel) {
                built
                    .get_mut(env)
                    .push(display_rel(&env_suffixed(&item.target_rel, env)));
            }
        }
    }

    Ok(built)
}

fn build_bundles(
    ctx: &BackendContext,
    scripts: &ResolvedScripts,
    ext: &str,
) -> ForgeResult<BuiltScripts> {
    let mut built = BuiltScripts::default();

    for env in [ScriptEnv::Server, ScriptEnv::Client] {
        let mut bundled = String::new();
        for item in scripts.shared.iter().chain(scripts.get(env)) {
            let compiled = process_source(ctx, env, item)?;
            let body = if ctx.minify {
                compiled
            } else {
                // Indent chunks so the bundle stays readable and collapsable.
                compiled
                    .lines()
                    .map(|line| format!("\t{}", line))
                    .collect::<Vec<_>>()
                    .join("\n")
            };
            bundled.push_str(&format!(
                "\n\n-- {}\ndo\n{}\nend",
                display_rel(&item.source_rel),
                body
            ));
        }

        if bundled.is_empty() {
            continue;
        }

        let bundle_name = format!("{}_bundle.{}", env.as_str(), ext);
        write_file(&ctx.output_target.join(&bundle_name), &bundled)?;
        built.get_mut(env).push(bundle_name);
    }

    Ok(built)
}

/// Preprocess one source for one environment, staging a copy in the
/// per-resource build cache.
fn process_source(ctx: &BackendContext, env: ScriptEnv, item: &ResolvedItem) -> ForgeResult<String> {
    let raw = fs::read_to_string(&item.source)?;

    let mut preprocessor = seeded_preprocessor(ctx, env);
    let processed = preprocessor.process(&raw);
    let cleaned = strip_blank_lines(&processed);

    if let Some(file_name) = item.source.file_name() {
        let staged = ctx.build_cache.join(env_suffixed(Path::new(file_name), env));
        write_file(&staged, &cleaned)?;
    }

    Ok(cleaned)
}

/// Header definitions every script sees: the current environment, the
/// resource name, and env vars (all of them on the server, prefix-exposed
/// ones elsewhere).
fn seeded_preprocessor(ctx: &BackendContext, env: ScriptEnv) -> Preprocessor {
    let mut preprocessor = Preprocessor::new();
    preprocessor.define("SCRIPT_ENV", env.as_str());
    preprocessor.define("RESOURCE_NAME", &ctx.resource_name);

    if env == ScriptEnv::Shared {
        preprocessor.define("IS_SHARED", "true");
    }
    if matches!(env, ScriptEnv::Server | ScriptEnv::Shared) {
        preprocessor.define("IS_SERVER", "true");
    }
    if matches!(env, ScriptEnv::Client | ScriptEnv::Shared) {
        preprocessor.define("IS_CLIENT", "true");
    }

    for (key, value) in &ctx.env {
        let exposed = env == ScriptEnv::Server
            || ENV_EXPOSED_PREFIXES.iter().any(|prefix| key.starts_with(prefix));
        if exposed {
            preprocessor.define(key, &quote_env_value(value));
        }
    }

    preprocessor
}

/// Numbers and booleans pass through; everything else becomes a quoted
/// literal so `#read` splices valid source text.
fn quote_env_value(value: &str) -> String {
    if value == "true" || value == "false" || value.parse::<f64>().is_ok() {
        value.to_string()
    } else {
        format!("'{}'", value)
    }
}

fn strip_blank_lines(content: &str) -> String {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn display_rel(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
