//! Template converters: deferred render functions.
//!
//! Both converters compile the template once at pipeline time and hand back
//! a render function; the variable bag is applied per `load()` call.

use std::path::Path;
use std::sync::Arc;

use minijinja::Environment;

use crate::error::PipelineError;
use crate::vars::VarBag;

use super::{Converted, Converter};

/// Full-document templating (`.ejs`).
///
/// Compiled with an environment whose loader is anchored at the file's
/// directory, so relative partial includes resolve against the document.
pub struct DocumentTemplate;

impl Converter for DocumentTemplate {
    fn extensions(&self) -> &[&str] {
        &["ejs"]
    }

    fn convert(&self, path: &Path, raw: &[u8]) -> Result<Converted, PipelineError> {
        let source = utf8(path, raw)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "template".to_string());

        let mut env = Environment::new();
        if let Some(dir) = path.parent() {
            env.set_loader(minijinja::path_loader(dir));
        }
        env.add_template_owned(name.clone(), source)
            .map_err(|e| convert_err(path, &e.to_string()))?;

        let env = Arc::new(env);
        let route = name.clone();
        let render = move |vars: &VarBag| -> Result<String, PipelineError> {
            let template = env
                .get_template(&name)
                .map_err(|e| render_err(&name, &e.to_string()))?;
            template
                .render(minijinja::Value::from_serialize(vars))
                .map_err(|e| render_err(&route, &e.to_string()))
        };

        Ok(Converted::Renderer(Box::new(render)))
    }
}

/// Logic-less templating (`.hbs` / `.handlebars`).
pub struct LogiclessTemplate;

impl Converter for LogiclessTemplate {
    fn extensions(&self) -> &[&str] {
        &["hbs", "handlebars"]
    }

    fn convert(&self, path: &Path, raw: &[u8]) -> Result<Converted, PipelineError> {
        let source = utf8(path, raw)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "template".to_string());

        let mut registry = handlebars::Handlebars::new();
        registry
            .register_template_string(&name, source)
            .map_err(|e| convert_err(path, &e.to_string()))?;

        let registry = Arc::new(registry);
        let render = move |vars: &VarBag| -> Result<String, PipelineError> {
            registry
                .render(&name, vars)
                .map_err(|e| render_err(&name, &e.to_string()))
        };

        Ok(Converted::Renderer(Box::new(render)))
    }
}

fn utf8(path: &Path, raw: &[u8]) -> Result<String, PipelineError> {
    String::from_utf8(raw.to_vec()).map_err(|_| convert_err(path, "source is not valid UTF-8"))
}

fn convert_err(path: &Path, message: &str) -> PipelineError {
    PipelineError::Convert {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

fn render_err(name: &str, message: &str) -> PipelineError {
    PipelineError::Render {
        route: name.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> VarBag {
        let mut bag = VarBag::new();
        for (k, v) in pairs {
            bag.insert((*k).to_string(), json!(v));
        }
        bag
    }

    #[test]
    fn test_document_template_renders_variables() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.ejs");
        fs::write(&path, "<h1>{{ title }}</h1>").unwrap();

        let converted = DocumentTemplate
            .convert(&path, &fs::read(&path).unwrap())
            .unwrap();
        let Converted::Renderer(render) = converted else {
            panic!("expected renderer");
        };

        assert_eq!(render(&vars(&[("title", "Hello")])).unwrap(), "<h1>Hello</h1>");
        assert_eq!(render(&vars(&[("title", "Other")])).unwrap(), "<h1>Other</h1>");
    }

    #[test]
    fn test_document_template_relative_include() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("header.ejs"), "<header>{{ site }}</header>").unwrap();
        let path = dir.path().join("page.ejs");
        fs::write(&path, "{% include \"header.ejs\" %}<main/>").unwrap();

        let converted = DocumentTemplate
            .convert(&path, &fs::read(&path).unwrap())
            .unwrap();
        let Converted::Renderer(render) = converted else {
            panic!("expected renderer");
        };

        assert_eq!(
            render(&vars(&[("site", "x")])).unwrap(),
            "<header>x</header><main/>"
        );
    }

    #[test]
    fn test_document_template_syntax_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.ejs");
        fs::write(&path, "{% if %}").unwrap();

        let result = DocumentTemplate.convert(&path, &fs::read(&path).unwrap());
        assert!(matches!(result, Err(PipelineError::Convert { .. })));
    }

    #[test]
    fn test_logicless_template() {
        let path = Path::new("/fake/card.hbs");
        let converted = LogiclessTemplate
            .convert(path, b"<p>{{name}}</p>")
            .unwrap();
        let Converted::Renderer(render) = converted else {
            panic!("expected renderer");
        };

        assert_eq!(render(&vars(&[("name", "a")])).unwrap(), "<p>a</p>");
    }
}
