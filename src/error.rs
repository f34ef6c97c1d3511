//! Pipeline error types.
//!
//! One variant per failure class, matching the failure policy table:
//! scan errors abort a build, conversion errors fail a single asset,
//! minification errors are recoverable, write errors abort a save.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the asset pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Root directory or a file inside it could not be listed or stat'd.
    /// Fatal for the whole build.
    #[error("failed to scan {}: {source}", .path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A source file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A template, script or stylesheet failed to convert.
    /// Fails the owning asset; `load()` rejects with this message.
    #[error("failed to convert {}: {message}", .path.display())]
    Convert { path: PathBuf, message: String },

    /// A minifier rejected its input. Recoverable: the caller logs and
    /// keeps the unminified content.
    #[error("failed to minify {content_type} content: {message}")]
    Minify {
        content_type: String,
        message: String,
    },

    /// A render function failed at load time.
    #[error("failed to render {route}: {message}")]
    Render { route: String, message: String },

    /// The asset's pipeline failed before this `load()` resolved.
    #[error("asset {route} failed: {message}")]
    Failed { route: String, message: String },

    /// Disk write failure during save. Aborts the whole save.
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The watch session could not start (watcher registration or reload
    /// server bind).
    #[error("failed to start watch session: {message}")]
    Watch { message: String },
}

impl PipelineError {
    /// Whether the error leaves the asset usable (unminified content kept).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Minify { .. })
    }
}
