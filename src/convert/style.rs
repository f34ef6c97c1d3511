//! Style-preprocessor compilation (`.sass` / `.scss`).
//!
//! Compiles to plain stylesheet text with `@import`/`@use` resolution
//! anchored at the source file's directory. Output is expanded; wire-level
//! compaction happens in the minification engine.

use std::path::Path;

use grass::{InputSyntax, Options, OutputStyle};

use crate::error::PipelineError;

use super::{Converted, Converter};

/// Indented (`.sass`) and block (`.scss`) preprocessor dialects.
pub struct Stylesheet;

impl Converter for Stylesheet {
    fn extensions(&self) -> &[&str] {
        &["sass", "scss"]
    }

    fn convert(&self, path: &Path, raw: &[u8]) -> Result<Converted, PipelineError> {
        let source = std::str::from_utf8(raw).map_err(|_| PipelineError::Convert {
            path: path.to_path_buf(),
            message: "source is not valid UTF-8".to_string(),
        })?;

        let syntax = match path.extension().and_then(|e| e.to_str()) {
            Some("sass") => InputSyntax::Sass,
            _ => InputSyntax::Scss,
        };

        let mut options = Options::default()
            .style(OutputStyle::Expanded)
            .input_syntax(syntax);
        if let Some(dir) = path.parent() {
            options = options.load_path(dir);
        }

        let css = grass::from_string(source, &options).map_err(|e| PipelineError::Convert {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Ok(Converted::Static(css.into_bytes()))
    }
}
