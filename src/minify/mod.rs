//! Content-type-keyed minification.
//!
//! Every transform is deterministic and idempotent: minifying already
//! minified content reproduces it. Minifier failures are observable — the
//! engine returns the error and the caller logs it and keeps the original
//! bytes, so a stubborn file degrades instead of breaking.

mod css;
mod html;
mod image;
mod js;

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::PipelineError;

pub use css::{StylesheetMinifier, minify_css};
pub use html::{MarkupMinifier, minify_html};
pub use image::{JpegCompressor, PngCompressor, SvgCompressor, WebpCompressor};
pub use js::{ScriptMinifier, minify_js};

/// A pluggable compaction transform for one or more content types.
pub trait Minifier: Send + Sync {
    /// Content types this minifier claims.
    fn content_types(&self) -> &[&str];

    /// Compact the content. Must be idempotent.
    fn minify(&self, content: &[u8]) -> Result<Vec<u8>, PipelineError>;
}

/// Content-type-keyed minification table.
pub struct MinificationEngine {
    minifiers: FxHashMap<String, Arc<dyn Minifier>>,
}

impl MinificationEngine {
    /// An engine with no registered transforms.
    pub fn empty() -> Self {
        Self {
            minifiers: FxHashMap::default(),
        }
    }

    /// Register a minifier for every content type it claims.
    pub fn register(&mut self, minifier: Arc<dyn Minifier>) {
        for content_type in minifier.content_types() {
            self.minifiers
                .insert((*content_type).to_string(), minifier.clone());
        }
    }

    /// Whether a transform is registered for this content type.
    pub fn supports(&self, content_type: &str) -> bool {
        self.minifiers.contains_key(content_type)
    }

    /// Minify content of the given type.
    ///
    /// `None` when no transform claims the type; `Some(Err)` surfaces a
    /// minifier failure for the caller to log before falling back to the
    /// original bytes.
    pub fn minify(
        &self,
        content_type: &str,
        content: &[u8],
    ) -> Option<Result<Vec<u8>, PipelineError>> {
        self.minifiers
            .get(content_type)
            .map(|minifier| minifier.minify(content))
    }
}

impl Default for MinificationEngine {
    /// The built-in whitelist: markup, stylesheets, scripts, and the
    /// raster/vector image formats the pipeline compresses.
    fn default() -> Self {
        let mut engine = Self::empty();
        engine.register(Arc::new(MarkupMinifier));
        engine.register(Arc::new(StylesheetMinifier));
        engine.register(Arc::new(ScriptMinifier));
        engine.register(Arc::new(PngCompressor));
        engine.register(Arc::new(JpegCompressor));
        engine.register(Arc::new(WebpCompressor));
        engine.register(Arc::new(SvgCompressor));
        engine
    }
}

/// Build a minify error for a content type.
pub(crate) fn minify_err(content_type: &str, message: impl Into<String>) -> PipelineError {
    PipelineError::Minify {
        content_type: content_type.to_string(),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mime::types;

    #[test]
    fn test_default_whitelist() {
        let engine = MinificationEngine::default();
        for content_type in [
            types::HTML,
            types::CSS,
            types::JAVASCRIPT,
            types::PNG,
            types::JPEG,
            types::WEBP,
            types::SVG,
        ] {
            assert!(engine.supports(content_type), "{content_type}");
        }
        assert!(!engine.supports(types::JSON));
        assert!(!engine.supports(types::PDF));
    }

    #[test]
    fn test_unsupported_type_is_none() {
        let engine = MinificationEngine::default();
        assert!(engine.minify(types::PDF, b"%PDF").is_none());
    }

    #[test]
    fn test_text_transforms_idempotent() {
        let engine = MinificationEngine::default();

        let cases: &[(&str, &[u8])] = &[
            (types::HTML, b"<p>  a  b  </p><!-- gone -->"),
            (types::CSS, b"body {  color : #ffffff ; }"),
            (types::JAVASCRIPT, b"function add(a, b) { return a + b; }"),
        ];

        for (content_type, input) in cases {
            let once = engine.minify(content_type, input).unwrap().unwrap();
            let twice = engine.minify(content_type, &once).unwrap().unwrap();
            assert_eq!(once, twice, "{content_type} not idempotent");
        }
    }
}
