//! CLI command implementations

mod build;
mod clean;
mod watch;

pub use build::{cmd_build, BuildFlags};
pub use clean::cmd_clean;
pub use watch::cmd_watch;
