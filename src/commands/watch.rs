use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;

use fxforge::build::BuildEngine;
use fxforge::config::Config;
use fxforge::watcher::{watch, NoopNotifier, WatchEvent};

pub fn cmd_watch(project_root: &Path, json: bool) -> Result<()> {
    let (config, warnings) = Config::load_or_default(project_root)?;
    for warning in &warnings {
        eprintln!(
            "warning: unknown configuration key '{}' in {}",
            warning.key,
            warning.file.display()
        );
    }

    let mut engine = BuildEngine::new(config);

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();
    ctrlc::set_handler(move || {
        running_clone.store(false, Ordering::SeqCst);
    })?;

    watch(&mut engine, &NoopNotifier, running, &|event| {
        render_event(event, json)
    })?;

    Ok(())
}

fn render_event(event: &WatchEvent, json: bool) {
    if json {
        println!("{}", event.to_json());
        return;
    }

    match event {
        WatchEvent::WatchStarted { source } => {
            println!("watching {} (Ctrl+C to stop)", source);
        }
        WatchEvent::FileChanged { resource, path } => {
            println!("  changed [{}] {}", resource, path);
        }
        WatchEvent::RebuildStarted { resource } => {
            println!("  rebuilding {}", resource);
        }
        WatchEvent::CascadeRebuilt { resource, dependents } => {
            if dependents.is_empty() {
                println!("  rebuilt {}", resource);
            } else {
                println!("  rebuilt {} (+ {})", resource, dependents.join(", "));
            }
        }
        WatchEvent::RebuildFailed { resource, reason } => {
            eprintln!("  failed {}: {}", resource, reason);
        }
        WatchEvent::RestartIssued { resources } => {
            println!("  restart requested: {}", resources.join(", "));
        }
        WatchEvent::Error { message } => {
            eprintln!("error: {}", message);
        }
        WatchEvent::Shutdown => {
            println!("watch stopped");
        }
    }
}
