use std::fs;
use std::path::Path;

use anyhow::Result;

use fxforge::config::Config;

/// Remove the built resource tree and the build cache.
pub fn cmd_clean(project_root: &Path, json: bool) -> Result<()> {
    let (config, _warnings) = Config::load_or_default(project_root)?;
    remove_outputs(&config)?;

    if json {
        println!("{{\"event\":\"cleaned\"}}");
    } else {
        println!(
            "removed {} and {}",
            config.resources_dist().display(),
            config.build.cache.display()
        );
    }
    Ok(())
}

pub(super) fn remove_outputs(config: &Config) -> Result<()> {
    for dir in [config.resources_dist(), config.build.cache.clone()] {
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
    }
    Ok(())
}
