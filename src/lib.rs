//! fxforge - resource build orchestrator for Cfx.re game servers
//!
//! fxforge turns a tree of source resources (Lua/JS plugin units plus static
//! assets) into deployable server artifacts: preprocessed scripts, copied
//! files and a generated `fxmanifest.lua` per resource. Builds are
//! incremental via a persistent checksum store, resources can import files
//! from each other with `$other/...` references, and watch mode cascades
//! rebuilds through the resulting import graph.

pub mod build;
pub mod checksum;
pub mod config;
pub mod emit;
pub mod error;
pub mod graph;
pub mod hash;
pub mod hooks;
pub mod manifest;
pub mod preprocess;
pub mod registry;
pub mod resolver;
pub mod watcher;

// Re-exports for convenience
pub use build::{
    default_backends, BackendContext, BuildEngine, BuildEvent, BuildOptions, BuildOutcome,
    BuiltScripts, RunSummary, ScriptBackend,
};
pub use config::Config;
pub use error::{ForgeError, ForgeResult};
pub use graph::ImportGraph;
pub use hooks::{HookContext, HookOutcome, HookPayload, HookPoint, HookRegistry};
pub use manifest::{ResourceManifest, ScriptEnv};
pub use preprocess::Preprocessor;
pub use registry::{Resource, ResourceRegistry};
pub use resolver::{parse_reference, resolve, Reference, ResolvedItem, ResolvedScripts};
pub use watcher::{watch, NoopNotifier, ServerNotifier, WatchEvent};
