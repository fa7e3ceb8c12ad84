//! `fxmanifest.lua` emitter
//!
//! Serializes one resource's manifest plus the paths produced by the
//! backends into the runtime's manifest text. The result is a committed
//! build artifact read by the runtime loader, so emission is deterministic:
//! identical resolved input yields byte-identical output (maps are
//! BTreeMap-backed, lists keep declaration order).

use crate::build::BuiltScripts;
use crate::error::ForgeResult;
use crate::graph::ImportGraph;
use crate::manifest::{ManifestValue, ResourceManifest, ScriptEnv};
use crate::registry::ResourceRegistry;
use crate::resolver;

/// File name of the emitted manifest
pub const FXMANIFEST_FILE: &str = "fxmanifest.lua";

const DEFAULT_FX_VERSION: &str = "cerulean";
const DEFAULT_YES: &str = "yes";
const DEFAULT_GAME: &str = "gta5";

/// Render the manifest document for one resource.
///
/// File references are resolved here (the files block lists resolved target
/// paths), so the registry and graph are threaded through; re-recording an
/// import edge is harmless because edges dedup by consumer.
pub fn render(
    registry: &mut ResourceRegistry,
    graph: &mut ImportGraph,
    consumer: &str,
    manifest: &ResourceManifest,
    built: &BuiltScripts,
    bundle: bool,
) -> ForgeResult<String> {
    let mut out = String::new();

    if !manifest.info.is_empty() {
        out.push_str("--[[\n");
        for (key, value) in &manifest.info {
            out.push_str(&format!("\t@{} {}\n", key, value));
        }
        out.push_str("]]\n\n");
    }

    let scalars: [(&str, Option<ManifestValue>); 11] = [
        (
            "fx_version",
            Some(string_or(manifest.fx_version.as_deref(), DEFAULT_FX_VERSION)),
        ),
        (
            "game",
            manifest
                .game
                .clone()
                .or_else(|| Some(ManifestValue::Array(vec![DEFAULT_GAME.into()]))),
        ),
        (
            "use_fxv2_oal",
            Some(string_or(manifest.use_fxv2_oal.as_deref(), DEFAULT_YES)),
        ),
        ("lua54", Some(string_or(manifest.lua54.as_deref(), DEFAULT_YES))),
        ("ui_page", manifest.ui_page.clone().map(ManifestValue::String)),
        ("dependencies", manifest.dependencies.clone()),
        (
            "loadscreen",
            manifest.loadscreen.clone().map(ManifestValue::String),
        ),
        (
            "loadscreen_manual_shutdown",
            manifest
                .loadscreen_manual_shutdown
                .clone()
                .map(ManifestValue::String),
        ),
        (
            "this_is_a_map",
            manifest.this_is_a_map.clone().map(ManifestValue::String),
        ),
        (
            "replace_level_meta",
            manifest.replace_level_meta.clone().map(ManifestValue::String),
        ),
        ("data_files", manifest.data_files.clone()),
    ];

    for (key, value) in scalars {
        if let Some(value) = value {
            out.push_str(&format!("{} {}\n", key, format_value(&value)));
        }
    }

    if manifest.server_only.as_deref() == Some(DEFAULT_YES) {
        out.push_str("server_only \"yes\"\n");
    }

    out.push('\n');

    // Script declarations: a single bundle reference per environment, or the
    // ordered per-file lists. The two modes are mutually exclusive.
    let mut dll_files: Vec<String> = Vec::new();
    if bundle {
        for env in [ScriptEnv::Server, ScriptEnv::Client] {
            for script in built.get(env) {
                out.push_str(&format!("{}_script '{}'\n", env.as_str(), script));
            }
        }
        out.push('\n');
    } else {
        for env in [ScriptEnv::Server, ScriptEnv::Client] {
            out.push_str(&format!("{}_scripts {{\n", env.as_str()));
            for script in built.shared.iter().chain(built.get(env)) {
                out.push_str(&format!("\t\"{}\",\n", script));
                if env == ScriptEnv::Client && script.ends_with(".dll") {
                    dll_files.push(script.clone());
                }
            }
            out.push_str("}\n\n");
        }
    }

    out.push_str("files {\n");
    for entry in &manifest.files {
        // Server-only files never ship through the files block.
        if entry.server_only() {
            continue;
        }
        if entry.skip_resolve() {
            out.push_str(&format!("\t'{}',\n", entry.src()));
            continue;
        }
        for item in resolver::resolve(registry, graph, consumer, entry.src())? {
            out.push_str(&format!("\t'{}',\n", display_rel(&item.target_rel)));
        }
    }
    for file in &dll_files {
        out.push_str(&format!("\t'{}',\n", file));
    }
    out.push_str("}\n\n");

    if !manifest.exports.is_empty() {
        for env in ScriptEnv::ALL {
            out.push_str(&format!("{}_exports {{\n", env.as_str()));
            for export in &manifest.exports {
                if export.env() == env {
                    out.push_str(&format!("\t\"{}\",\n", export.function()));
                }
            }
            out.push_str("}\n\n");
        }
    }

    if let Some(map) = &manifest.map {
        out.push_str(&format!("map \"{}\"\n", map));
    }

    for (key, tuples) in &manifest.settings {
        for (name, value) in tuples {
            out.push_str(&format!("{} \"{}\" {}\n", key, name, format_value(value)));
        }
    }

    Ok(out)
}

/// Recursive, total value formatter: numbers verbatim, booleans as literal
/// words, strings quoted, arrays and maps as bracketed blocks.
pub fn format_value(value: &ManifestValue) -> String {
    match value {
        ManifestValue::Bool(b) => b.to_string(),
        ManifestValue::Int(i) => i.to_string(),
        ManifestValue::Float(f) => f.to_string(),
        ManifestValue::String(s) => format!("\"{}\"", s),
        ManifestValue::Array(items) => {
            let mut out = String::from("{\n");
            for item in items {
                out.push_str(&format!("\t{},\n", format_value(item)));
            }
            out.push('}');
            out
        }
        ManifestValue::Map(entries) => {
            let mut out = String::from("{\n");
            for (key, value) in entries {
                out.push_str(&format!("{} = {},\n", key, format_value(value)));
            }
            out.push('}');
            out
        }
    }
}

fn string_or(value: Option<&str>, default: &str) -> ManifestValue {
    ManifestValue::String(value.unwrap_or(default).to_string())
}

fn display_rel(path: &std::path::Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::collections::BTreeMap;

    fn fixture(manifest_yaml: &str, files: &[&str]) -> (tempfile::TempDir, ResourceRegistry, ImportGraph) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("src/app");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("manifest.yaml"), manifest_yaml).unwrap();
        for rel in files {
            let path = root.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "").unwrap();
        }

        let mut config = Config::default();
        config.build.source = dir.path().join("src");
        config.build.dist = dir.path().join(".dist");

        let mut registry = ResourceRegistry::new(&config);
        registry.discover().unwrap();
        (dir, registry, ImportGraph::new())
    }

    #[test]
    fn format_value_covers_all_shapes() {
        assert_eq!(format_value(&ManifestValue::Int(42)), "42");
        assert_eq!(format_value(&ManifestValue::Float(1.5)), "1.5");
        assert_eq!(format_value(&ManifestValue::Bool(true)), "true");
        assert_eq!(format_value(&"gta5".into()), "\"gta5\"");

        let array = ManifestValue::Array(vec!["a".into(), ManifestValue::Int(2)]);
        assert_eq!(format_value(&array), "{\n\t\"a\",\n\t2,\n}");

        let mut entries = BTreeMap::new();
        entries.insert("rate".to_string(), ManifestValue::Int(30));
        assert_eq!(
            format_value(&ManifestValue::Map(entries)),
            "{\nrate = 30,\n}"
        );
    }

    #[test]
    fn defaults_fill_unset_scalars() {
        let (_dir, mut registry, mut graph) = fixture("{}", &[]);
        let manifest = registry.get("app").unwrap().manifest().clone();

        let doc = render(
            &mut registry,
            &mut graph,
            "app",
            &manifest,
            &BuiltScripts::default(),
            false,
        )
        .unwrap();

        assert!(doc.contains("fx_version \"cerulean\""));
        assert!(doc.contains("game {\n\t\"gta5\",\n}"));
        assert!(doc.contains("use_fxv2_oal \"yes\""));
        assert!(doc.contains("lua54 \"yes\""));
    }

    #[test]
    fn emits_full_document() {
        let yaml = r#"
fx_version: bodacious
ui_page: ui/index.html
info:
  author: fxforge
map: maps/city.lua
files:
  - data/config.json
  - src: secrets/server.json
    serverOnly: true
  - src: generated/at_build.json
    skipResolve: true
exports:
  - getBalance
  - function: notify
    env: client
settings:
  convar:
    - ["voice_enabled", true]
"#;
        let (_dir, mut registry, mut graph) = fixture(yaml, &["data/config.json"]);
        let manifest = registry.get("app").unwrap().manifest().clone();

        let built = BuiltScripts {
            shared: vec![],
            server: vec!["server/main_server.lua".to_string()],
            client: vec!["client/main_client.lua".to_string(), "client/hud.dll".to_string()],
        };

        let doc = render(&mut registry, &mut graph, "app", &manifest, &built, false).unwrap();

        let expected = "--[[\n\
\t@author fxforge\n\
]]\n\
\n\
fx_version \"bodacious\"\n\
game {\n\t\"gta5\",\n}\n\
use_fxv2_oal \"yes\"\n\
lua54 \"yes\"\n\
ui_page \"ui/index.html\"\n\
\n\
server_scripts {\n\
\t\"server/main_server.lua\",\n\
}\n\
\n\
client_scripts {\n\
\t\"client/main_client.lua\",\n\
\t\"client/hud.dll\",\n\
}\n\
\n\
files {\n\
\t'data/config.json',\n\
\t'generated/at_build.json',\n\
\t'client/hud.dll',\n\
}\n\
\n\
shared_exports {\n\
}\n\
\n\
server_exports {\n\
\t\"getBalance\",\n\
}\n\
\n\
client_exports {\n\
\t\"notify\",\n\
}\n\
\n\
map \"maps/city.lua\"\n\
convar \"voice_enabled\" true\n";

        assert_eq!(doc, expected);
    }

    #[test]
    fn bundling_emits_single_script_directives() {
        let (_dir, mut registry, mut graph) = fixture("{}", &[]);
        let manifest = registry.get("app").unwrap().manifest().clone();

        let built = BuiltScripts {
            shared: vec![],
            server: vec!["server_bundle.lua".to_string()],
            client: vec!["client_bundle.lua".to_string()],
        };

        let doc = render(&mut registry, &mut graph, "app", &manifest, &built, true).unwrap();
        assert!(doc.contains("server_script 'server_bundle.lua'"));
        assert!(doc.contains("client_script 'client_bundle.lua'"));
        assert!(!doc.contains("server_scripts {"));
    }

    #[test]
    fn emission_is_deterministic() {
        let yaml = r#"
info:
  b: two
  a: one
files:
  - data/**/*.json
"#;
        let (_dir, mut registry, mut graph) =
            fixture(yaml, &["data/a.json", "data/nested/b.json"]);
        let manifest = registry.get("app").unwrap().manifest().clone();
        let built = BuiltScripts::default();

        let first = render(&mut registry, &mut graph, "app", &manifest, &built, false).unwrap();
        let second = render(&mut registry, &mut graph, "app", &manifest, &built, false).unwrap();
        assert_eq!(first, second);
        assert!(first.contains("'data/a.json'"));
        assert!(first.contains("'data/nested/b.json'"));
    }
}
