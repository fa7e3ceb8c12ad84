//! Watch mode
//!
//! A file-system watcher runs next to an otherwise idle build engine. Each
//! change event maps to its owning resource and resets that resource's
//! debounce timer; when the timer fires the resource rebuilds, every
//! consumer reachable through the import graph rebuilds after it, and the
//! external server is told which resources to restart.

mod debounce;
mod event;
mod ignore;

pub use debounce::{DebounceScheduler, DEBOUNCE_MS};
pub use event::WatchEvent;
pub use ignore::{WatchIgnore, WATCHER_IGNORE_FILE};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::channel;
use std::sync::Arc;
use std::time::{Duration, Instant};

use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::build::{BuildEngine, BuildEvent, BuildOptions, BuildOutcome};
use crate::error::{ForgeError, ForgeResult};

/// External "restart resources" operation; the server process itself is
/// managed outside the build core.
pub trait ServerNotifier {
    fn restart_resources(&self, resources: &[String]);
}

/// Notifier for setups with no attached server process
pub struct NoopNotifier;

impl ServerNotifier for NoopNotifier {
    fn restart_resources(&self, _resources: &[String]) {}
}

/// Run the watch loop until `running` is cleared.
///
/// Performs an initial full build (populating the registry, import graph and
/// checksum store), then debounces change events per resource and cascades
/// rebuilds through the import graph.
pub fn watch(
    engine: &mut BuildEngine,
    notifier: &dyn ServerNotifier,
    running: Arc<AtomicBool>,
    on_event: &dyn Fn(&WatchEvent),
) -> ForgeResult<()> {
    let source_root = engine.registry().source_root().to_path_buf();
    on_event(&WatchEvent::WatchStarted {
        source: source_root.display().to_string(),
    });

    let options = BuildOptions::from_config(engine.config());
    engine.run(&options, &|event| forward_build_event(event, on_event))?;

    let (tx, rx) = channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res {
                for path in event.paths {
                    let _ = tx.send(path);
                }
            }
        },
        NotifyConfig::default(),
    )
    .map_err(|e| ForgeError::Watch {
        message: e.to_string(),
    })?;

    watcher
        .watch(&source_root, RecursiveMode::Recursive)
        .map_err(|e| ForgeError::Watch {
            message: e.to_string(),
        })?;

    let mut scheduler = DebounceScheduler::new(Duration::from_millis(DEBOUNCE_MS));
    let mut ignores: HashMap<String, WatchIgnore> = HashMap::new();

    // Startup cooldown: notify sometimes reports existing files right after
    // the watcher registers. Drain those.
    let cooldown_end = Instant::now() + Duration::from_millis(500);
    while Instant::now() < cooldown_end {
        let _ = rx.recv_timeout(Duration::from_millis(50));
    }

    while running.load(Ordering::SeqCst) {
        if let Ok(path) = rx.recv_timeout(Duration::from_millis(50)) {
            handle_change(engine, &path, &mut scheduler, &mut ignores, on_event);
        }

        for name in scheduler.due() {
            rebuild_cascade(engine, &name, notifier, on_event);
            // The rebuild reloads the manifest; its ignore set may differ.
            ignores.remove(&name);
        }
    }

    on_event(&WatchEvent::Shutdown);
    Ok(())
}

fn handle_change(
    engine: &BuildEngine,
    path: &PathBuf,
    scheduler: &mut DebounceScheduler,
    ignores: &mut HashMap<String, WatchIgnore>,
    on_event: &dyn Fn(&WatchEvent),
) {
    let Some((name, root)) = engine.registry().resource_for_path(path) else {
        return;
    };

    let ignore = ignores.entry(name.clone()).or_insert_with(|| {
        let pattern = engine
            .registry()
            .get(&name)
            .and_then(|resource| resource.manifest().watcher.ignore.clone());
        WatchIgnore::load(&root, pattern.as_deref())
    });

    let rel = path.strip_prefix(&root).unwrap_or(path);
    if ignore.is_ignored(rel, path.is_dir()) {
        return;
    }

    if scheduler.reset(&name) {
        on_event(&WatchEvent::FileChanged {
            resource: name,
            path: path.display().to_string(),
        });
    }
}

/// Rebuild one resource, then every dependent reachable through the import
/// graph, then notify the server. Returns the ordered affected names (the
/// changed resource first).
///
/// Dependents rebuild with force: the provider's changed file was already
/// re-hashed during the provider's own rebuild, so a checksum-gated rebuild
/// would skip re-importing it.
pub fn rebuild_cascade(
    engine: &mut BuildEngine,
    name: &str,
    notifier: &dyn ServerNotifier,
    on_event: &dyn Fn(&WatchEvent),
) -> Vec<String> {
    on_event(&WatchEvent::RebuildStarted {
        resource: name.to_string(),
    });

    let base = BuildOptions::from_config(engine.config());
    let options = BuildOptions {
        reload_manifest: true,
        ..base.clone()
    };

    match engine.build_resource(name, &options, &|event| forward_build_event(event, on_event)) {
        BuildOutcome::Failed { reason } => {
            on_event(&WatchEvent::RebuildFailed {
                resource: name.to_string(),
                reason,
            });
            return Vec::new();
        }
        BuildOutcome::Disabled => return Vec::new(),
        BuildOutcome::Built { .. } => {}
    }

    let dependents = engine.graph().dependents_of(name);
    let force = BuildOptions {
        force: true,
        reload_manifest: true,
        ..base
    };

    let mut affected = vec![name.to_string()];
    for dependent in &dependents {
        match engine.build_resource(dependent, &force, &|event| {
            forward_build_event(event, on_event)
        }) {
            BuildOutcome::Built { .. } => affected.push(dependent.clone()),
            BuildOutcome::Disabled => {}
            BuildOutcome::Failed { reason } => on_event(&WatchEvent::RebuildFailed {
                resource: dependent.clone(),
                reason,
            }),
        }
    }

    if let Err(err) = engine.persist_cache() {
        on_event(&WatchEvent::Error {
            message: err.to_string(),
        });
    }

    on_event(&WatchEvent::CascadeRebuilt {
        resource: name.to_string(),
        dependents: affected[1..].to_vec(),
    });

    notifier.restart_resources(&affected);
    on_event(&WatchEvent::RestartIssued {
        resources: affected.clone(),
    });

    affected
}

fn forward_build_event(event: &BuildEvent, on_event: &dyn Fn(&WatchEvent)) {
    match event {
        BuildEvent::ResourceFailed { resource, reason } => on_event(&WatchEvent::Error {
            message: format!("failed to build resource {}: {}", resource, reason),
        }),
        BuildEvent::Warning { message } => on_event(&WatchEvent::Error {
            message: message.clone(),
        }),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::cell::RefCell;
    use std::fs;

    struct RecordingNotifier {
        restarts: RefCell<Vec<Vec<String>>>,
    }

    impl RecordingNotifier {
        fn new() -> Self {
            Self {
                restarts: RefCell::new(Vec::new()),
            }
        }
    }

    impl ServerNotifier for RecordingNotifier {
        fn restart_resources(&self, resources: &[String]) {
            self.restarts.borrow_mut().push(resources.to_vec());
        }
    }

    fn ignore_events(_: &WatchEvent) {}

    fn project(files: &[(&str, &str)]) -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        for (rel, content) in files {
            let path = dir.path().join("src").join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }

        let mut config = Config::default();
        config.build.source = dir.path().join("src");
        config.build.dist = dir.path().join(".dist");
        config.build.cache = dir.path().join(".cache");
        (dir, config)
    }

    #[test]
    fn cascade_rebuilds_consumers_and_notifies_in_order() {
        let (dir, config) = project(&[
            ("core/manifest.yaml", "shared_scripts:\n  - shared/util.lua\n"),
            ("core/shared/util.lua", "u = 1\n"),
            (
                "app/manifest.yaml",
                "server_scripts:\n  - \"$core/shared/util.lua\"\n",
            ),
        ]);
        let mut engine = BuildEngine::new(config.clone());
        engine
            .run(&BuildOptions::default(), &|_| {})
            .unwrap();

        // Change the provider's file, then fire the cascade for it.
        fs::write(dir.path().join("src/core/shared/util.lua"), "u = 2\n").unwrap();
        let notifier = RecordingNotifier::new();
        let affected = rebuild_cascade(&mut engine, "core", &notifier, &ignore_events);

        assert_eq!(affected, ["core", "app"]);
        assert_eq!(notifier.restarts.borrow().as_slice(), [affected.clone()]);

        // The consumer re-imported the new content.
        let imported = fs::read_to_string(
            config
                .resources_dist()
                .join("app/_imports/core/shared/util_server.lua"),
        )
        .unwrap();
        assert!(imported.contains("u = 2"));
    }

    #[test]
    fn cascade_of_a_leaf_resource_touches_only_it() {
        let (_dir, config) = project(&[
            ("solo/manifest.yaml", "server_scripts:\n  - main.lua\n"),
            ("solo/main.lua", "x = 1\n"),
        ]);
        let mut engine = BuildEngine::new(config);
        engine.run(&BuildOptions::default(), &|_| {}).unwrap();

        let notifier = RecordingNotifier::new();
        let affected = rebuild_cascade(&mut engine, "solo", &notifier, &ignore_events);
        assert_eq!(affected, ["solo"]);
    }

    #[test]
    fn failed_rebuild_skips_the_cascade_and_notification() {
        let (dir, config) = project(&[
            ("core/manifest.yaml", "{}"),
            ("core/shared/util.lua", "u = 1\n"),
            (
                "app/manifest.yaml",
                "server_scripts:\n  - \"$core/shared/util.lua\"\n",
            ),
        ]);
        let mut engine = BuildEngine::new(config);
        engine.run(&BuildOptions::default(), &|_| {}).unwrap();

        // Break core's manifest into an ambiguous rename.
        fs::write(
            dir.path().join("src/core/manifest.yaml"),
            "server_scripts:\n  - \"shared/*.lua:one.lua\"\n",
        )
        .unwrap();
        fs::write(dir.path().join("src/core/shared/b.lua"), "").unwrap();

        let notifier = RecordingNotifier::new();
        let affected = rebuild_cascade(&mut engine, "core", &notifier, &ignore_events);
        assert!(affected.is_empty());
        assert!(notifier.restarts.borrow().is_empty());
    }
}
