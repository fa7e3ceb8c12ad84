use std::path::Path;

use anyhow::{bail, Result};

use fxforge::build::{BuildEngine, BuildEvent, BuildOptions};
use fxforge::config::Config;

/// Flags accepted by `fxforge build`
pub struct BuildFlags {
    pub force: bool,
    pub bundle: bool,
    pub minify: bool,
    pub clean: bool,
}

pub fn cmd_build(project_root: &Path, flags: BuildFlags, json: bool) -> Result<()> {
    let (config, warnings) = Config::load_or_default(project_root)?;
    for warning in &warnings {
        eprintln!(
            "warning: unknown configuration key '{}' in {}",
            warning.key,
            warning.file.display()
        );
    }

    if flags.clean {
        super::clean::remove_outputs(&config)?;
    }

    let options = BuildOptions {
        force: flags.force,
        bundle: flags.bundle || config.build.bundle,
        minify: flags.minify || config.build.minify,
        reload_manifest: false,
    };

    let mut engine = BuildEngine::new(config);
    let summary = engine.run(&options, &|event| render_event(event, json))?;

    if !json {
        println!(
            "{} built, {} disabled, {} failed",
            summary.built.len(),
            summary.disabled.len(),
            summary.failed.len()
        );
    }

    if !summary.is_success() {
        bail!("{} resource(s) failed to build", summary.failed.len());
    }
    Ok(())
}

fn render_event(event: &BuildEvent, json: bool) {
    if json {
        println!("{}", event.to_json());
        return;
    }

    match event {
        BuildEvent::RunStarted { resources } => {
            println!("building {} resource(s)", resources);
        }
        BuildEvent::ResourceBuilt { resource, inclusions } => {
            if inclusions.is_empty() {
                println!("  built {}", resource);
            } else {
                println!("  built {} (imports: {})", resource, inclusions.join(", "));
            }
        }
        BuildEvent::ResourceDisabled { resource } => {
            println!("  skipped {} (disabled)", resource);
        }
        BuildEvent::ResourceFailed { resource, reason } => {
            eprintln!("  failed {}: {}", resource, reason);
        }
        BuildEvent::Warning { message } => {
            eprintln!("warning: {}", message);
        }
        BuildEvent::CachePersisted { entries } => {
            println!("checksum store saved ({} entries)", entries);
        }
    }
}
