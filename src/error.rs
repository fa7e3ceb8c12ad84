//! Error types for fxforge
//!
//! Uses `thiserror` for library errors; the CLI boundary wraps these in
//! `anyhow::Result`.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for fxforge operations
pub type ForgeResult<T> = Result<T, ForgeError>;

/// Main error type for fxforge operations
#[derive(Error, Debug)]
pub enum ForgeError {
    /// Resource manifest could not be read or parsed
    #[error("failed to load manifest {path}: {message}")]
    ManifestLoad { path: PathBuf, message: String },

    /// A rename target was given for a reference that matched several files
    #[error("cannot rename '{reference}': {matches} files matched")]
    ResolutionAmbiguity { reference: String, matches: usize },

    /// A backend builder failed while compiling a resource
    #[error("backend '{backend}' failed for resource '{resource}': {message}")]
    Builder {
        resource: String,
        backend: String,
        message: String,
    },

    /// Invalid project configuration
    #[error("invalid configuration in {path}: {message}")]
    InvalidConfig { path: PathBuf, message: String },

    /// No resource manifests found under the source tree
    #[error("no resources found under {root}")]
    NoResources { root: PathBuf },

    /// The checksum store could not be written back to disk
    #[error("failed to persist checksum store {path}: {message}")]
    CachePersist { path: PathBuf, message: String },

    /// File watcher error
    #[error("watcher error: {message}")]
    Watch { message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
