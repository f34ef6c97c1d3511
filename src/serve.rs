//! HTTP-shaped request handling over a route table.
//!
//! The handler is framework-agnostic: it answers with `None` when a request
//! is not for it (wrong method, prefix mismatch, unknown route) so the
//! caller can fall through to its own routing, and `Some(response)` when an
//! asset matched.

use crate::error::PipelineError;
use crate::registry::RouteTable;
use crate::vars::VarBag;

/// Options for a [`ServeHandler`].
#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// Request methods the handler answers. Matching is case-insensitive.
    pub methods: Vec<String>,

    /// Route prefix prepended to the request path before the table lookup,
    /// for handlers mounted under a sub-router that already stripped it.
    pub prefix: Option<String>,

    /// `Cache-Control: max-age` seconds. Unset defaults to 3600 in
    /// production mode and 0 otherwise.
    pub cache: Option<u32>,

    /// Response status for assets without their own override.
    pub status: Option<u16>,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            methods: vec!["GET".to_string(), "HEAD".to_string(), "OPTIONS".to_string()],
            prefix: None,
            cache: None,
            status: None,
        }
    }
}

/// A response produced by the handler, ready to translate into any HTTP
/// server's response type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub cache_control: String,
    pub body: Vec<u8>,
}

/// Serves assets from a live route table.
pub struct ServeHandler {
    table: RouteTable,
    options: ServeOptions,
    production: bool,
}

impl ServeHandler {
    pub(crate) fn new(table: RouteTable, options: ServeOptions, production: bool) -> Self {
        Self {
            table,
            options,
            production,
        }
    }

    /// Answer a request, or `None` to delegate it.
    ///
    /// Status precedence: the asset's own override, then the handler
    /// default, then 200. HEAD responses carry headers but no body.
    pub async fn handle(
        &self,
        method: &str,
        path: &str,
        vars: Option<&VarBag>,
    ) -> Option<Result<ServedResponse, PipelineError>> {
        if !self
            .options
            .methods
            .iter()
            .any(|m| m.eq_ignore_ascii_case(method))
        {
            return None;
        }

        let key = match &self.options.prefix {
            Some(prefix) => normalize(&format!("{prefix}{}", ensure_leading_slash(path))),
            None => normalize(path),
        };
        let asset = self.table.get(&key)?;

        let status = asset
            .status()
            .or(self.options.status)
            .unwrap_or(200);
        let max_age = self
            .options
            .cache
            .unwrap_or(if self.production { 3600 } else { 0 });

        let body = match asset.load(vars).await {
            Ok(bytes) => bytes,
            Err(e) => return Some(Err(e)),
        };

        Some(Ok(ServedResponse {
            status,
            content_type: asset.content_type(),
            cache_control: format!("max-age={max_age}"),
            body: if method.eq_ignore_ascii_case("head") {
                Vec::new()
            } else {
                body
            },
        }))
    }
}

/// Shape a request path like a route key: leading slash, no trailing slash
/// except for the root, query string dropped.
fn normalize(path: &str) -> String {
    let path = path.split('?').next().unwrap_or(path);
    let mut name = ensure_leading_slash(path);
    while name.len() > 1 && name.ends_with('/') {
        name.pop();
    }
    name
}

fn ensure_leading_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::BuildOptions;
    use crate::registry::Registry;
    use std::fs;
    use tempfile::TempDir;

    async fn handler(options: ServeOptions, production: bool) -> (TempDir, ServeHandler) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
        fs::write(dir.path().join("404.html"), "<h1>gone</h1>").unwrap();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/guide.html"), "<p>guide</p>").unwrap();

        let build = BuildOptions {
            production,
            ..Default::default()
        };
        let registry = Registry::build(dir.path(), build).await.unwrap();
        let handler = ServeHandler::new(registry.table(), options, production);
        (dir, handler)
    }

    #[tokio::test]
    async fn test_get_known_route() {
        let (_dir, handler) = handler(ServeOptions::default(), false).await;
        let response = handler.handle("GET", "/", None).await.unwrap().unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.content_type, "text/html");
        assert_eq!(response.cache_control, "max-age=0");
        assert_eq!(response.body, b"<h1>home</h1>");
    }

    #[tokio::test]
    async fn test_unknown_route_delegates() {
        let (_dir, handler) = handler(ServeOptions::default(), false).await;
        assert!(handler.handle("GET", "/absent", None).await.is_none());
    }

    #[tokio::test]
    async fn test_disallowed_method_delegates() {
        let (_dir, handler) = handler(ServeOptions::default(), false).await;
        assert!(handler.handle("POST", "/", None).await.is_none());
        // allowed methods match case-insensitively
        assert!(handler.handle("get", "/", None).await.is_some());
    }

    #[tokio::test]
    async fn test_head_has_no_body() {
        let (_dir, handler) = handler(ServeOptions::default(), false).await;
        let response = handler.handle("HEAD", "/", None).await.unwrap().unwrap();
        assert_eq!(response.status, 200);
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn test_production_cache_default() {
        let (_dir, handler) = handler(ServeOptions::default(), true).await;
        let response = handler.handle("GET", "/", None).await.unwrap().unwrap();
        assert_eq!(response.cache_control, "max-age=3600");
    }

    #[tokio::test]
    async fn test_explicit_cache_wins() {
        let options = ServeOptions {
            cache: Some(60),
            ..Default::default()
        };
        let (_dir, handler) = handler(options, true).await;
        let response = handler.handle("GET", "/", None).await.unwrap().unwrap();
        assert_eq!(response.cache_control, "max-age=60");
    }

    #[tokio::test]
    async fn test_prefix_prepended_to_lookup() {
        let options = ServeOptions {
            prefix: Some("/docs".to_string()),
            ..Default::default()
        };
        let (_dir, handler) = handler(options, false).await;

        let response = handler.handle("GET", "/guide", None).await.unwrap().unwrap();
        assert_eq!(response.body, b"<p>guide</p>");
        // No asset lives under the prefixed key for this path.
        assert!(handler.handle("GET", "/index", None).await.is_none());
    }

    #[tokio::test]
    async fn test_trailing_slash_and_query_normalized() {
        let (_dir, handler) = handler(ServeOptions::default(), false).await;
        assert!(handler.handle("GET", "/404/", None).await.is_some());
        assert!(handler.handle("GET", "/404?x=1", None).await.is_some());
    }

    #[tokio::test]
    async fn test_asset_status_override_wins() {
        let (_dir, handler) = handler(
            ServeOptions {
                status: Some(203),
                ..Default::default()
            },
            false,
        )
        .await;

        let asset = handler.table.get("/404").unwrap();
        asset.set_status(404);

        let response = handler.handle("GET", "/404", None).await.unwrap().unwrap();
        assert_eq!(response.status, 404);

        let other = handler.handle("GET", "/", None).await.unwrap().unwrap();
        assert_eq!(other.status, 203);
    }
}
