//! Build lifecycle hooks
//!
//! A hook is an externally supplied function invoked at a defined lifecycle
//! point to customize one resource's build. Handlers are registered by name
//! at configuration time; a manifest refers to them via its `hooks` map
//! (`pre_build: my-hook`). A missing name or a failing handler is logged and
//! treated as a no-op - hooks never fail a build.
//!
//! The contract is context-in/context-out: the returned context's manifest
//! replaces the in-memory one, and `post_resolve` may hand back a
//! replacement script set.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::ForgeResult;
use crate::manifest::ResourceManifest;
use crate::resolver::ResolvedScripts;

/// Lifecycle points at which hooks run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPoint {
    PreBuild,
    PostResolve,
    PostBuild,
    Finished,
}

impl HookPoint {
    /// Key used in a manifest's `hooks` map
    pub fn key(&self) -> &'static str {
        match self {
            HookPoint::PreBuild => "pre_build",
            HookPoint::PostResolve => "post_resolve",
            HookPoint::PostBuild => "post_build",
            HookPoint::Finished => "finished",
        }
    }
}

/// Per-resource context handed to every hook
#[derive(Debug, Clone)]
pub struct HookContext {
    pub resource_name: String,
    pub resource_root: PathBuf,
    pub output_target: PathBuf,
    pub manifest: ResourceManifest,
}

/// Point-specific payload
#[derive(Debug, Clone, Default)]
pub enum HookPayload {
    #[default]
    None,
    /// `post_resolve`: the per-environment resolved script sets
    Resolved(ResolvedScripts),
}

/// What a hook hands back
#[derive(Debug, Clone)]
pub struct HookOutcome {
    pub context: HookContext,
    pub payload: HookPayload,
}

impl HookOutcome {
    /// Pass-through outcome keeping context and payload unchanged
    pub fn unchanged(context: HookContext, payload: HookPayload) -> Self {
        Self { context, payload }
    }
}

type HookFn = Box<dyn Fn(HookContext, HookPayload) -> ForgeResult<HookOutcome>>;

/// Hook-name-keyed function table, built once at configuration time
#[derive(Default)]
pub struct HookRegistry {
    handlers: HashMap<String, HookFn>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under a name manifests can refer to.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: impl Fn(HookContext, HookPayload) -> ForgeResult<HookOutcome> + 'static,
    ) {
        self.handlers.insert(name.into(), Box::new(handler));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Invoke a registered handler. `None` means no handler carries that
    /// name; the caller logs and continues.
    pub fn call(
        &self,
        name: &str,
        context: HookContext,
        payload: HookPayload,
    ) -> Option<ForgeResult<HookOutcome>> {
        self.handlers
            .get(name)
            .map(|handler| handler(context, payload))
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("HookRegistry").field("handlers", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> HookContext {
        HookContext {
            resource_name: "app".to_string(),
            resource_root: PathBuf::from("src/app"),
            output_target: PathBuf::from(".dist/server-data/resources/app"),
            manifest: ResourceManifest::default(),
        }
    }

    #[test]
    fn registered_hook_replaces_the_manifest() {
        let mut registry = HookRegistry::new();
        registry.register("stamp-version", |mut ctx, payload| {
            ctx.manifest.fx_version = Some("bodacious".to_string());
            Ok(HookOutcome::unchanged(ctx, payload))
        });

        let outcome = registry
            .call("stamp-version", context(), HookPayload::None)
            .unwrap()
            .unwrap();
        assert_eq!(outcome.context.manifest.fx_version.as_deref(), Some("bodacious"));
    }

    #[test]
    fn unregistered_name_returns_none() {
        let registry = HookRegistry::new();
        assert!(registry.call("ghost", context(), HookPayload::None).is_none());
        assert!(!registry.contains("ghost"));
    }

    #[test]
    fn post_resolve_payload_round_trips() {
        let mut registry = HookRegistry::new();
        registry.register("drop-client", |ctx, payload| match payload {
            HookPayload::Resolved(mut scripts) => {
                scripts.client.clear();
                Ok(HookOutcome::unchanged(ctx, HookPayload::Resolved(scripts)))
            }
            other => Ok(HookOutcome::unchanged(ctx, other)),
        });

        let payload = HookPayload::Resolved(ResolvedScripts::default());
        let outcome = registry
            .call("drop-client", context(), payload)
            .unwrap()
            .unwrap();
        assert!(matches!(outcome.payload, HookPayload::Resolved(_)));
    }
}
