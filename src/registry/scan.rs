//! Recursive source-tree discovery.
//!
//! The walk is all-or-nothing: any unreadable directory or entry aborts the
//! scan with the failing path, so a build never silently serves a partial
//! tree.

use std::path::{Path, PathBuf};

use crate::error::PipelineError;
use crate::options::BuildOptions;

/// A discovered source file, keyed by its path relative to the scan root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute path on disk.
    pub path: PathBuf,
    /// Path relative to the scan root, used for route derivation.
    pub relative: PathBuf,
}

/// Walk `root` depth-first and collect every file not excluded by the
/// options' skip list.
///
/// Skip prefixes match against root-relative paths, so `skip = ["drafts"]`
/// excludes the whole `drafts/` subtree.
pub fn scan(root: &Path, options: &BuildOptions) -> Result<Vec<SourceFile>, PipelineError> {
    let mut files = Vec::new();
    walk(root, root, options, &mut files)?;
    // Deterministic ordering keeps logs and save output stable.
    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(files)
}

fn walk(
    root: &Path,
    dir: &Path,
    options: &BuildOptions,
    out: &mut Vec<SourceFile>,
) -> Result<(), PipelineError> {
    let entries = std::fs::read_dir(dir).map_err(|e| PipelineError::Scan {
        path: dir.to_path_buf(),
        source: e,
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| PipelineError::Scan {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| PipelineError::Scan {
            path: path.clone(),
            source: e,
        })?;

        // Strip-prefix cannot fail inside the walk.
        let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
        if options.is_skipped(&relative) {
            continue;
        }

        if file_type.is_dir() {
            walk(root, &path, options, out)?;
        } else if file_type.is_file() {
            out.push(SourceFile { path, relative });
        }
        // Symlinks and other special entries are ignored.
    }

    Ok(())
}
