//! Script minification using oxc.

use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

use crate::error::PipelineError;
use crate::mime::types;

use super::{Minifier as MinifierTrait, minify_err};

/// Minify script source code.
///
/// Parse errors are returned, not swallowed; the caller decides whether to
/// keep the unminified source.
pub fn minify_js(source: &str) -> Result<String, PipelineError> {
    let allocator = Allocator::default();
    let source_type = SourceType::mjs();
    let ret = Parser::new(&allocator, source, source_type).parse();
    if !ret.errors.is_empty() {
        let detail = ret
            .errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(minify_err(types::JAVASCRIPT, detail));
    }
    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;
    Ok(code)
}

/// Script transform for the minification table.
pub struct ScriptMinifier;

impl MinifierTrait for ScriptMinifier {
    fn content_types(&self) -> &[&str] {
        &[types::JAVASCRIPT]
    }

    fn minify(&self, content: &[u8]) -> Result<Vec<u8>, PipelineError> {
        let source = std::str::from_utf8(content)
            .map_err(|_| minify_err(types::JAVASCRIPT, "content is not valid UTF-8"))?;
        minify_js(source).map(String::into_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minify_js_compacts() {
        let out = minify_js("function add (a, b) {\n  return a + b;\n}\nexport { add };").unwrap();
        assert!(out.len() < 50);
        assert!(!out.contains('\n'));
    }

    #[test]
    fn test_minify_js_idempotent() {
        let once = minify_js("export const x = 1 + 2;").unwrap();
        let twice = minify_js(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_minify_js_syntax_error() {
        let result = minify_js("function {");
        assert!(matches!(result, Err(PipelineError::Minify { .. })));
    }
}
