//! fxforge CLI - resource build orchestrator for Cfx.re game servers
//!
//! Usage: fxforge <COMMAND>
//!
//! Commands:
//!   build   Build every resource under the source tree
//!   watch   Rebuild on change and cascade through imports
//!   clean   Remove built outputs and the build cache

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{cmd_build, cmd_clean, cmd_watch};

/// fxforge - resource build orchestrator for Cfx.re game servers
#[derive(Parser, Debug)]
#[command(name = "fxforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Emit NDJSON events for CI
    #[arg(long, default_value = "false")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build every resource under the source tree
    Build {
        /// Project root (directory holding fxforge.toml)
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// Rebuild everything, ignoring the checksum store
        #[arg(short, long)]
        force: bool,

        /// Merge each environment's scripts into one bundle file
        #[arg(long)]
        bundle: bool,

        /// Minify bundled output
        #[arg(long)]
        minify: bool,

        /// Remove previous outputs before building
        #[arg(long)]
        clean: bool,
    },

    /// Rebuild on change and cascade through imports
    Watch {
        /// Project root (directory holding fxforge.toml)
        #[arg(short, long, default_value = ".")]
        root: PathBuf,
    },

    /// Remove built outputs and the build cache
    Clean {
        /// Project root (directory holding fxforge.toml)
        #[arg(short, long, default_value = ".")]
        root: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            root,
            force,
            bundle,
            minify,
            clean,
        } => cmd_build(
            &root,
            commands::BuildFlags {
                force,
                bundle,
                minify,
                clean,
            },
            cli.json,
        ),
        Commands::Watch { root } => cmd_watch(&root, cli.json),
        Commands::Clean { root } => cmd_clean(&root, cli.json),
    }
}
