//! Build options for a registry.
//!
//! Options are plain data: deserializable from TOML for projects that keep
//! their pipeline settings in a config file, or constructed directly.
//!
//! # Example
//!
//! ```toml
//! skip = ["templates"]            # subtrees excluded from the scan
//! raw = ["assets/js"]             # pre-built subtrees served byte-for-byte
//! watch = true                    # rebuild + notify on file changes
//! preserve_extensions = false     # keep on-disk extensions in route names
//! reload_port = 7931              # push channel port
//! production = false              # drives the serve cache default
//!
//! [variables]
//! site_name = "example"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::vars::VarBag;

/// Options accepted by [`Registry::build`](crate::Registry::build).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// Root-relative path prefixes excluded from the scan.
    pub skip: Vec<PathBuf>,

    /// Root-relative prefixes of pre-built subtrees. Files under these are
    /// served byte-for-byte with no conversion or minification.
    pub raw: Vec<PathBuf>,

    /// Default variable bag merged into every render.
    pub variables: VarBag,

    /// Watch the root for changes, rebuild, and notify browsers.
    pub watch: bool,

    /// Keep on-disk extensions in route names (used when materializing to
    /// disk rather than serving dynamically).
    pub preserve_extensions: bool,

    /// Port for the live-reload push channel.
    pub reload_port: u16,

    /// Production-like mode: serve cache defaults to 3600 instead of 0.
    pub production: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            skip: Vec::new(),
            raw: vec![PathBuf::from("assets/js")],
            variables: VarBag::new(),
            watch: false,
            preserve_extensions: false,
            reload_port: 7931,
            production: false,
        }
    }
}

impl BuildOptions {
    /// Parse options from a TOML string.
    pub fn from_toml(source: &str) -> Result<Self> {
        toml::from_str(source).context("invalid build options")
    }

    /// Load options from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&source)
    }

    /// Whether `path` (relative to the root) falls under a skip prefix.
    pub fn is_skipped(&self, rel: &Path) -> bool {
        self.skip.iter().any(|prefix| rel.starts_with(prefix))
    }

    /// Whether `path` (relative to the root) falls under a pre-built subtree.
    pub fn is_raw(&self, rel: &Path) -> bool {
        self.raw.iter().any(|prefix| rel.starts_with(prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = BuildOptions::default();
        assert!(options.skip.is_empty());
        assert_eq!(options.raw, vec![PathBuf::from("assets/js")]);
        assert!(!options.watch);
        assert!(!options.preserve_extensions);
        assert_eq!(options.reload_port, 7931);
    }

    #[test]
    fn test_from_toml() {
        let options = BuildOptions::from_toml(
            "skip = [\"templates\"]\nwatch = true\nreload_port = 8000\n\n[variables]\nname = \"x\"",
        )
        .unwrap();

        assert_eq!(options.skip, vec![PathBuf::from("templates")]);
        assert!(options.watch);
        assert_eq!(options.reload_port, 8000);
        assert_eq!(
            options.variables.get("name").and_then(|v| v.as_str()),
            Some("x")
        );
        // untouched fields keep their defaults
        assert!(!options.preserve_extensions);
    }

    #[test]
    fn test_from_toml_invalid() {
        assert!(BuildOptions::from_toml("skip = 5").is_err());
    }

    #[test]
    fn test_is_skipped() {
        let options = BuildOptions {
            skip: vec![PathBuf::from("templates")],
            ..Default::default()
        };
        assert!(options.is_skipped(Path::new("templates/header.ejs")));
        assert!(!options.is_skipped(Path::new("about/index.ejs")));
        // prefix match is per path segment, not per byte
        assert!(!options.is_skipped(Path::new("templates2/x.ejs")));
    }

    #[test]
    fn test_is_raw() {
        let options = BuildOptions::default();
        assert!(options.is_raw(Path::new("assets/js/app.js")));
        assert!(!options.is_raw(Path::new("assets/app.scss")));
    }
}
