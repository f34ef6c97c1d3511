//! Format conversion (pure, extension-keyed).
//!
//! Each source dialect registers a [`Converter`] under its extensions;
//! dispatch is a table lookup, so new formats plug in without touching any
//! central conditional. Converters either produce static output bytes or a
//! deferred render function that takes a variable bag.

mod script;
mod style;
mod template;

use std::path::Path;

use rustc_hash::FxHashMap;

use crate::error::PipelineError;
use crate::vars::VarBag;

pub use script::ComponentScript;
pub use style::Stylesheet;
pub use template::{DocumentTemplate, LogiclessTemplate};

/// Deferred artifact: variables in, final text out.
pub type RenderFn = Box<dyn Fn(&VarBag) -> Result<String, PipelineError> + Send + Sync>;

/// Output of a conversion.
pub enum Converted {
    /// Immutable output bytes.
    Static(Vec<u8>),
    /// A render function awaiting variables.
    Renderer(RenderFn),
}

impl Converted {
    /// Whether this is static content (render functions defer minification
    /// to load time).
    pub fn is_static(&self) -> bool {
        matches!(self, Self::Static(_))
    }
}

/// A pluggable source-format transform.
pub trait Converter: Send + Sync {
    /// Extensions this converter claims (lowercase, without the dot).
    fn extensions(&self) -> &[&str];

    /// Convert raw source bytes into an artifact.
    ///
    /// `path` is the absolute source path; converters that resolve relative
    /// includes anchor them at its parent directory.
    fn convert(&self, path: &Path, raw: &[u8]) -> Result<Converted, PipelineError>;
}

/// Extension-keyed conversion table.
pub struct ConversionEngine {
    converters: FxHashMap<String, Box<dyn Converter>>,
}

impl ConversionEngine {
    /// An engine with no registered formats (everything passes through).
    pub fn empty() -> Self {
        Self {
            converters: FxHashMap::default(),
        }
    }

    /// Register a converter for every extension it claims.
    ///
    /// A later registration for the same extension replaces the earlier one.
    pub fn register(&mut self, converter: Box<dyn Converter>) {
        // The table owns one boxed converter per claimed extension; dialects
        // claiming several extensions register a shared handle instead.
        let exts: Vec<String> = converter
            .extensions()
            .iter()
            .map(|e| e.to_string())
            .collect();
        let shared = std::sync::Arc::new(converter);
        for ext in exts {
            self.converters.insert(ext, Box::new(SharedConverter(shared.clone())));
        }
    }

    /// Whether a converter is registered for this file's extension.
    pub fn handles(&self, path: &Path) -> bool {
        extension_of(path).is_some_and(|ext| self.converters.contains_key(ext))
    }

    /// Convert a file, or pass its bytes through unchanged when no
    /// converter claims the extension.
    pub fn convert(&self, path: &Path, raw: Vec<u8>) -> Result<Converted, PipelineError> {
        match extension_of(path).and_then(|ext| self.converters.get(ext)) {
            Some(converter) => converter.convert(path, &raw),
            None => Ok(Converted::Static(raw)),
        }
    }
}

impl Default for ConversionEngine {
    /// The built-in format set: full-document templates, logic-less
    /// templates, component scripts, style preprocessors.
    fn default() -> Self {
        let mut engine = Self::empty();
        engine.register(Box::new(DocumentTemplate));
        engine.register(Box::new(LogiclessTemplate));
        engine.register(Box::new(ComponentScript::default()));
        engine.register(Box::new(Stylesheet));
        engine
    }
}

/// Adapter so one converter instance can back several extensions.
struct SharedConverter(std::sync::Arc<Box<dyn Converter>>);

impl Converter for SharedConverter {
    fn extensions(&self) -> &[&str] {
        self.0.extensions()
    }

    fn convert(&self, path: &Path, raw: &[u8]) -> Result<Converted, PipelineError> {
        self.0.convert(path, raw)
    }
}

#[inline]
fn extension_of(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}
