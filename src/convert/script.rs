//! Component-script transpilation (`.jsx`).
//!
//! Lowers the JSX dialect to plain script text: element syntax becomes
//! calls to the element-construction pragma, async syntax is lowered to
//! explicit continuations, and a compress pass strips dead code and folds
//! literals. Codegen stays readable; wire-level compaction is the
//! minification engine's job.

use std::path::Path;

use oxc::allocator::Allocator;
use oxc::codegen::Codegen;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::semantic::SemanticBuilder;
use oxc::span::SourceType;
use oxc::transformer::{JsxRuntime, TransformOptions, Transformer};

use crate::error::PipelineError;

use super::{Converted, Converter};

/// Language target the async/arrow lowering aims at.
const TARGET: &str = "es2016";

/// JSX-dialect converter with a configurable element pragma.
pub struct ComponentScript {
    pragma: String,
}

impl ComponentScript {
    pub fn with_pragma(pragma: impl Into<String>) -> Self {
        Self {
            pragma: pragma.into(),
        }
    }
}

impl Default for ComponentScript {
    fn default() -> Self {
        Self::with_pragma("Aviation.element")
    }
}

impl Converter for ComponentScript {
    fn extensions(&self) -> &[&str] {
        &["jsx"]
    }

    fn convert(&self, path: &Path, raw: &[u8]) -> Result<Converted, PipelineError> {
        let source = std::str::from_utf8(raw)
            .map_err(|_| convert_err(path, "source is not valid UTF-8"))?;

        let allocator = Allocator::default();
        let parsed = Parser::new(&allocator, source, SourceType::jsx()).parse();
        if !parsed.errors.is_empty() {
            return Err(convert_err(path, &join_errors(&parsed.errors)));
        }
        let mut program = parsed.program;

        let scoping = SemanticBuilder::new()
            .build(&program)
            .semantic
            .into_scoping();

        let mut options = TransformOptions::from_target(TARGET)
            .map_err(|e| convert_err(path, &format!("{e:?}")))?;
        options.jsx.runtime = JsxRuntime::Classic;
        options.jsx.pragma = Some(self.pragma.clone());

        let transformed =
            Transformer::new(&allocator, path, &options).build_with_scoping(scoping, &mut program);
        if !transformed.errors.is_empty() {
            return Err(convert_err(path, &join_errors(&transformed.errors)));
        }

        // Compress only: dead code elimination and literal folding, no
        // identifier mangling and no minified codegen.
        let compressed = Minifier::new(MinifierOptions {
            mangle: None,
            compress: Some(CompressOptions::default()),
        })
        .minify(&allocator, &mut program);

        let code = Codegen::new()
            .with_scoping(compressed.scoping)
            .build(&program)
            .code;

        Ok(Converted::Static(code.into_bytes()))
    }
}

fn join_errors(errors: &[oxc::diagnostics::OxcDiagnostic]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn convert_err(path: &Path, message: &str) -> PipelineError {
    PipelineError::Convert {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn transpile(source: &str) -> Result<String, PipelineError> {
        let out = ComponentScript::default()
            .convert(&PathBuf::from("app.jsx"), source.as_bytes())?;
        match out {
            Converted::Static(bytes) => Ok(String::from_utf8(bytes).unwrap()),
            Converted::Renderer(_) => panic!("expected static output"),
        }
    }

    #[test]
    fn test_jsx_lowered_to_pragma_calls() {
        let code = transpile("export const App = () => <div id=\"root\">hi</div>;").unwrap();
        assert!(code.contains("Aviation.element("));
        assert!(!code.contains("<div"));
    }

    #[test]
    fn test_custom_pragma() {
        // Exported so the compress pass cannot eliminate the element call.
        let out = ComponentScript::with_pragma("h")
            .convert(&PathBuf::from("app.jsx"), b"export const x = <p/>;")
            .unwrap();
        let Converted::Static(bytes) = out else {
            panic!("expected static output");
        };
        let code = String::from_utf8(bytes).unwrap();
        assert!(code.contains("h("));
    }

    #[test]
    fn test_syntax_error_is_convert_error() {
        let result = transpile("const = <div>;");
        assert!(matches!(result, Err(PipelineError::Convert { .. })));
    }
}
