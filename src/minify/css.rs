//! Stylesheet minification using lightningcss.
//!
//! One parse+print pass covers the whole compaction story: duplicate
//! selector merging, expression folding, vendor prefixing per browser
//! defaults, and sorted minified output.

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};

use crate::error::PipelineError;
use crate::mime::types;

use super::{Minifier, minify_err};

/// Browser floor the compactor prefixes for. Versions are encoded as
/// `major << 16 | minor << 8 | patch`.
fn browser_targets() -> Targets {
    Targets::from(Browsers {
        chrome: Some(90 << 16),
        edge: Some(90 << 16),
        firefox: Some(78 << 16),
        safari: Some(12 << 16),
        ios_saf: Some(12 << 16),
        ..Browsers::default()
    })
}

/// Minify stylesheet source code.
pub fn minify_css(source: &str) -> Result<String, PipelineError> {
    let mut stylesheet = StyleSheet::parse(source, ParserOptions::default())
        .map_err(|e| minify_err(types::CSS, e.to_string()))?;
    stylesheet
        .minify(MinifyOptions {
            targets: browser_targets(),
            ..MinifyOptions::default()
        })
        .map_err(|e| minify_err(types::CSS, e.to_string()))?;
    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            targets: browser_targets(),
            ..PrinterOptions::default()
        })
        .map_err(|e| minify_err(types::CSS, e.to_string()))?;
    Ok(result.code)
}

/// Stylesheet transform for the minification table.
pub struct StylesheetMinifier;

impl Minifier for StylesheetMinifier {
    fn content_types(&self) -> &[&str] {
        &[types::CSS]
    }

    fn minify(&self, content: &[u8]) -> Result<Vec<u8>, PipelineError> {
        let source = std::str::from_utf8(content)
            .map_err(|_| minify_err(types::CSS, "content is not valid UTF-8"))?;
        minify_css(source).map(String::into_bytes)
    }
}
