//! Reference-string resolution
//!
//! A manifest reference has the shape
//! `("$" resourceName "/")? innerGlob (":" targetRename)?`.
//!
//! Without a resource name, the glob resolves against the declaring
//! resource's own root and targets mirror the relative path. With one, the
//! glob resolves against that provider's root (no transitive imports) and
//! every match is remapped under the *consumer's* output tree at
//! `_imports/<provider>/...`; resolving such a reference also records an
//! edge in the import graph - graph discovery is incidental to resolution.
//!
//! Glob patterns use gitignore syntax anchored at the resource root, so
//! `*.lua` matches only top-level files and `**/*.lua` matches recursively.

use std::fs;
use std::path::{Path, PathBuf};

use ignore::gitignore::GitignoreBuilder;

use crate::error::{ForgeError, ForgeResult};
use crate::graph::ImportGraph;
use crate::manifest::ScriptEnv;
use crate::registry::ResourceRegistry;

/// One source -> target file mapping produced by resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedItem {
    /// Resource that owns the source file
    pub provider: String,
    /// Absolute (or project-relative) source path
    pub source: PathBuf,
    /// Source path relative to the provider's root
    pub source_rel: PathBuf,
    /// Target path under the consumer's output tree
    pub target: PathBuf,
    /// Target path relative to the consumer's output tree (manifest path)
    pub target_rel: PathBuf,
}

/// Per-environment sets of resolved script items
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedScripts {
    pub shared: Vec<ResolvedItem>,
    pub server: Vec<ResolvedItem>,
    pub client: Vec<ResolvedItem>,
}

impl ResolvedScripts {
    pub fn get(&self, env: ScriptEnv) -> &Vec<ResolvedItem> {
        match env {
            ScriptEnv::Shared => &self.shared,
            ScriptEnv::Server => &self.server,
            ScriptEnv::Client => &self.client,
        }
    }

    pub fn get_mut(&mut self, env: ScriptEnv) -> &mut Vec<ResolvedItem> {
        match env {
            ScriptEnv::Shared => &mut self.shared,
            ScriptEnv::Server => &mut self.server,
            ScriptEnv::Client => &mut self.client,
        }
    }

    pub fn len(&self) -> usize {
        self.shared.len() + self.server.len() + self.client.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subset whose source file names satisfy a predicate
    pub fn filter(&self, keep: impl Fn(&str) -> bool) -> ResolvedScripts {
        let matches = |items: &[ResolvedItem]| {
            items
                .iter()
                .filter(|item| {
                    item.source
                        .file_name()
                        .map(|n| keep(&n.to_string_lossy()))
                        .unwrap_or(false)
                })
                .cloned()
                .collect()
        };
        ResolvedScripts {
            shared: matches(&self.shared),
            server: matches(&self.server),
            client: matches(&self.client),
        }
    }
}

/// Parsed form of a reference string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub provider: Option<String>,
    pub pattern: String,
    pub rename: Option<String>,
}

/// Split a reference into provider, glob and rename parts.
///
/// An invalid provider segment (bad characters, too long) is not an error:
/// the whole string falls back to being a local glob, as the original
/// grammar is purely best-effort.
pub fn parse_reference(raw: &str) -> Reference {
    let mut provider = None;
    let mut rest = raw;

    if let Some(stripped) = rest.strip_prefix('$') {
        if let Some((name, tail)) = stripped.split_once('/') {
            if is_valid_resource_name(name) {
                provider = Some(name.to_string());
                rest = tail;
            }
        }
    }

    let (pattern, rename) = match rest.rsplit_once(':') {
        Some((head, tail))
            if !head.is_empty() && !tail.is_empty() && !tail.contains(['\r', '\n']) =>
        {
            (head.to_string(), Some(tail.to_string()))
        }
        _ => (rest.to_string(), None),
    };

    Reference {
        provider,
        pattern,
        rename,
    }
}

fn is_valid_resource_name(name: &str) -> bool {
    (1..=24).contains(&name.len())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Resolve a reference declared by `consumer` into concrete file mappings.
///
/// Zero matches (including an unknown provider) is a valid empty result. A
/// rename against more than one match is rejected.
pub fn resolve(
    registry: &mut ResourceRegistry,
    graph: &mut ImportGraph,
    consumer: &str,
    raw: &str,
) -> ForgeResult<Vec<ResolvedItem>> {
    let reference = parse_reference(raw);

    let Some(consumer_resource) = registry.get(consumer) else {
        return Ok(Vec::new());
    };
    let consumer_root = consumer_resource.root().to_path_buf();
    let consumer_output = consumer_resource.output_target().to_path_buf();

    if let Some(provider_name) = &reference.provider {
        let Some(provider) = registry.obtain(provider_name) else {
            return Ok(Vec::new());
        };
        let provider_root = provider.root().to_path_buf();

        let matches = glob_files(&provider_root, &reference.pattern)?;
        reject_ambiguous_rename(raw, &reference, matches.len())?;
        if matches.is_empty() {
            return Ok(Vec::new());
        }

        if provider_name != consumer {
            graph.record(provider_name, consumer);
        }

        let import_root = PathBuf::from("_imports").join(provider_name);
        Ok(matches
            .into_iter()
            .map(|(source, source_rel)| {
                let mapped = reference
                    .rename
                    .as_ref()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| source_rel.clone());
                ResolvedItem {
                    provider: provider_name.clone(),
                    source,
                    source_rel,
                    target: consumer_output.join(import_root.join(&mapped)),
                    target_rel: import_root.join(&mapped),
                }
            })
            .collect())
    } else {
        let matches = glob_files(&consumer_root, &reference.pattern)?;
        reject_ambiguous_rename(raw, &reference, matches.len())?;

        Ok(matches
            .into_iter()
            .map(|(source, source_rel)| {
                let target_rel = reference
                    .rename
                    .as_ref()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| source_rel.clone());
                ResolvedItem {
                    provider: consumer.to_string(),
                    source,
                    source_rel,
                    target: consumer_output.join(&target_rel),
                    target_rel,
                }
            })
            .collect())
    }
}

fn reject_ambiguous_rename(raw: &str, reference: &Reference, matches: usize) -> ForgeResult<()> {
    if reference.rename.is_some() && matches > 1 {
        return Err(ForgeError::ResolutionAmbiguity {
            reference: raw.to_string(),
            matches,
        });
    }
    Ok(())
}

/// Match a glob against the files under `root`, returning (absolute,
/// relative) pairs in path order. Directories are excluded; brackets in the
/// pattern are escaped so literal `[`/`]` in file names are not glob syntax.
fn glob_files(root: &Path, pattern: &str) -> ForgeResult<Vec<(PathBuf, PathBuf)>> {
    if pattern.is_empty() || !root.is_dir() {
        return Ok(Vec::new());
    }

    let sanitized = sanitize_brackets(&pattern.replace('\\', "/"));
    let anchored = if sanitized.starts_with('/') {
        sanitized
    } else {
        format!("/{sanitized}")
    };

    let mut builder = GitignoreBuilder::new(root);
    if builder.add_line(None, &anchored).is_err() {
        // Unparsable pattern: zero matches, not a hard error.
        return Ok(Vec::new());
    }
    let Ok(matcher) = builder.build() else {
        return Ok(Vec::new());
    };

    let mut files = Vec::new();
    walk_files(root, &mut files)?;
    files.sort();

    Ok(files
        .into_iter()
        .filter_map(|path| {
            let rel = path.strip_prefix(root).ok()?.to_path_buf();
            matcher
                .matched(&rel, false)
                .is_ignore()
                .then_some((path, rel))
        })
        .collect())
}

fn walk_files(dir: &Path, out: &mut Vec<PathBuf>) -> ForgeResult<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

fn sanitize_brackets(pattern: &str) -> String {
    pattern.replace('[', "\\[").replace(']', "\\]")
}
