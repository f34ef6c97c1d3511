//! Materialize a built table to disk.

use std::path::Path;

use crate::error::PipelineError;
use crate::registry::RouteTable;
use crate::route;
use crate::vars::VarBag;
use crate::log;

/// Write every asset in the table under `out_dir`.
///
/// File names come from each source path with dialect extensions
/// canonicalized (`.ejs` → `.html`, `.jsx` → `.js`, `.scss` → `.css`), so
/// the output tree is servable by any static file server. The first failed
/// load or write aborts the run.
pub(crate) async fn save_all(
    table: &RouteTable,
    root: &Path,
    out_dir: &Path,
    vars: Option<&VarBag>,
) -> Result<(), PipelineError> {
    let mut entries = table.snapshot();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    for (_, asset) in entries {
        let rel = asset.source().strip_prefix(root).unwrap_or(asset.source());
        let name = route::canonical_save_name(rel);
        let target = out_dir.join(name.trim_start_matches('/'));

        let bytes = asset.load(vars).await?;

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PipelineError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        std::fs::write(&target, bytes).map_err(|e| PipelineError::Write {
            path: target.clone(),
            source: e,
        })?;
        log!("save"; "{}", target.display());
    }

    Ok(())
}
