//! Per-file asset state machine.
//!
//! Every asset owns one pipeline task: fetch → convert → minify → ready.
//! The pipeline runs exactly once per asset instance; readiness is a watch
//! channel that `load()` awaits (a registered continuation, never an
//! interval poll), so any number of concurrent `load()` calls resolve from
//! the single run. A failed read or conversion parks the asset in
//! `Failed` and every pending and future `load()` rejects with the cause
//! instead of hanging.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::sync::watch;

use crate::convert::{Converted, ConversionEngine, RenderFn};
use crate::error::PipelineError;
use crate::minify::MinificationEngine;
use crate::vars::{VarBag, merge_vars};
use crate::{debug, log, mime};

/// Pipeline phase of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetState {
    Pending,
    Converting,
    Minifying,
    Ready,
    Failed,
}

impl AssetState {
    /// Terminal states resolve the readiness signal.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

/// The artifact an asset pipeline produced.
pub enum AssetContent {
    /// Immutable output bytes.
    Static(Vec<u8>),
    /// Deferred render function; variables are applied per `load()`.
    Renderer(RenderFn),
}

/// Everything a pipeline run needs besides the asset itself.
pub(crate) struct PipelineSpec {
    /// Absolute source path.
    pub source: PathBuf,
    /// Route name (unique key in the registry table).
    pub route: String,
    /// Serve the raw bytes untouched (pre-built subtree).
    pub raw: bool,
    /// Live-reload bootstrap appended to markup before conversion.
    pub inject: Option<String>,
    pub convert: Arc<ConversionEngine>,
    pub minify: Arc<MinificationEngine>,
    /// Registry-level default variables.
    pub defaults: Arc<VarBag>,
}

/// One compiled, servable artifact derived from a single source file.
pub struct Asset {
    source: PathBuf,
    route: String,
    content_type: &'static str,
    minified: AtomicBool,
    /// Per-asset HTTP status override; 0 means unset.
    status: AtomicU16,
    state: watch::Sender<AssetState>,
    /// Set exactly once, before the terminal state is broadcast.
    content: OnceLock<Result<AssetContent, String>>,
    minify: Arc<MinificationEngine>,
    defaults: Arc<VarBag>,
}

impl Asset {
    /// Create the asset and start its pipeline task.
    ///
    /// Returns before the pipeline completes; `load()` suspends until it
    /// does. Must be called within a tokio runtime.
    pub(crate) fn spawn(spec: PipelineSpec) -> Arc<Self> {
        let (state, _) = watch::channel(AssetState::Pending);
        let asset = Arc::new(Self {
            content_type: mime::for_source(&spec.source),
            source: spec.source.clone(),
            route: spec.route.clone(),
            minified: AtomicBool::new(false),
            status: AtomicU16::new(0),
            state,
            content: OnceLock::new(),
            minify: spec.minify.clone(),
            defaults: spec.defaults.clone(),
        });

        let task_asset = asset.clone();
        tokio::spawn(async move {
            task_asset.run_pipeline(&spec);
        });

        asset
    }

    /// Execute fetch → convert → minify and resolve the readiness signal.
    fn run_pipeline(&self, spec: &PipelineSpec) {
        match self.build_content(spec) {
            Ok(content) => {
                let _ = self.content.set(Ok(content));
                self.state.send_replace(AssetState::Ready);
            }
            Err(e) => {
                debug!("asset"; "{} failed: {e}", self.route);
                let _ = self.content.set(Err(e.to_string()));
                self.state.send_replace(AssetState::Failed);
            }
        }
    }

    fn build_content(&self, spec: &PipelineSpec) -> Result<AssetContent, PipelineError> {
        let mut raw = std::fs::read(&self.source).map_err(|e| PipelineError::Read {
            path: self.source.clone(),
            source: e,
        })?;

        // Pre-built subtrees skip the whole pipeline.
        if spec.raw {
            return Ok(AssetContent::Static(raw));
        }

        // Markup served in watch mode carries the live-reload bootstrap;
        // appended before conversion so templates pick it up too.
        if self.content_type == mime::types::HTML
            && let Some(snippet) = &spec.inject
        {
            raw.extend_from_slice(snippet.as_bytes());
        }

        let converted = if spec.convert.handles(&self.source) {
            self.state.send_replace(AssetState::Converting);
            spec.convert.convert(&self.source, raw)?
        } else {
            Converted::Static(raw)
        };

        let content = match converted {
            Converted::Static(bytes) => AssetContent::Static(self.minify_static(bytes)),
            // Render functions are minified per invocation inside load().
            Converted::Renderer(render) => AssetContent::Renderer(render),
        };

        Ok(content)
    }

    /// Minify static bytes when the content type is whitelisted; a
    /// minifier failure is logged and the original bytes are kept.
    fn minify_static(&self, bytes: Vec<u8>) -> Vec<u8> {
        self.state.send_replace(AssetState::Minifying);
        match self.minify.minify(self.content_type, &bytes) {
            Some(Ok(minified)) => {
                self.minified.store(true, Ordering::Relaxed);
                minified
            }
            Some(Err(e)) => {
                log!("minify"; "{}: {e}", self.route);
                bytes
            }
            None => bytes,
        }
    }

    /// Resolve the asset's bytes, suspending until the pipeline reaches a
    /// terminal state.
    ///
    /// Static content is returned as-is; render functions are invoked with
    /// `vars` merged over the registry defaults and (for markup) minified
    /// per call. Each call is independent — there is no per-variable
    /// render cache.
    pub async fn load(&self, vars: Option<&VarBag>) -> Result<Vec<u8>, PipelineError> {
        let mut rx = self.state.subscribe();
        // The sender lives in self, so the channel cannot close under us.
        let _ = rx.wait_for(|state| state.is_terminal()).await;

        match self.content.get() {
            Some(Ok(AssetContent::Static(bytes))) => Ok(bytes.clone()),
            Some(Ok(AssetContent::Renderer(render))) => {
                let merged = merge_vars(&self.defaults, vars);
                let text = render(&merged)?;
                if self.content_type == mime::types::HTML {
                    match self.minify.minify(self.content_type, text.as_bytes()) {
                        Some(Ok(minified)) => Ok(minified),
                        Some(Err(e)) => {
                            log!("minify"; "{}: {e}", self.route);
                            Ok(text.into_bytes())
                        }
                        None => Ok(text.into_bytes()),
                    }
                } else {
                    Ok(text.into_bytes())
                }
            }
            Some(Err(message)) => Err(PipelineError::Failed {
                route: self.route.clone(),
                message: message.clone(),
            }),
            // Terminal state is only broadcast after content is set.
            None => Err(PipelineError::Failed {
                route: self.route.clone(),
                message: "pipeline resolved without content".to_string(),
            }),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    /// Current pipeline phase.
    pub fn state(&self) -> AssetState {
        *self.state.borrow()
    }

    /// Whether the static content went through minification.
    pub fn is_minified(&self) -> bool {
        self.minified.load(Ordering::Relaxed)
    }

    /// Per-asset HTTP status override (e.g. a `/404` page served as 404).
    pub fn set_status(&self, status: u16) {
        self.status.store(status, Ordering::Relaxed);
    }

    pub fn status(&self) -> Option<u16> {
        match self.status.load(Ordering::Relaxed) {
            0 => None,
            status => Some(status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::Converter;
    use serde_json::json;
    use std::fs;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    fn spec_for(source: PathBuf, convert: Arc<ConversionEngine>) -> PipelineSpec {
        PipelineSpec {
            route: "/test".to_string(),
            source,
            raw: false,
            inject: None,
            convert,
            minify: Arc::new(MinificationEngine::default()),
            defaults: Arc::new(VarBag::new()),
        }
    }

    /// Converter that counts invocations; used to prove at-most-once runs.
    struct Counting(Arc<AtomicUsize>);

    impl Converter for Counting {
        fn extensions(&self) -> &[&str] {
            &["cnt"]
        }

        fn convert(&self, _path: &Path, raw: &[u8]) -> Result<Converted, PipelineError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            // Simulate a slow CPU-bound conversion.
            std::thread::sleep(std::time::Duration::from_millis(20));
            Ok(Converted::Static(raw.to_vec()))
        }
    }

    #[tokio::test]
    async fn test_static_load_is_stable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.css");
        fs::write(&path, "body {  color : #ffffff ; }").unwrap();

        let asset = Asset::spawn(spec_for(path, Arc::new(ConversionEngine::default())));
        let first = asset.load(None).await.unwrap();
        let second = asset.load(None).await.unwrap();

        assert_eq!(first, second);
        assert!(asset.is_minified());
        assert_eq!(asset.state(), AssetState::Ready);
    }

    #[tokio::test]
    async fn test_concurrent_loads_single_pipeline_run() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.cnt");
        fs::write(&path, "payload").unwrap();

        let counter = Arc::new(AtomicUsize::new(0));
        let mut engine = ConversionEngine::empty();
        engine.register(Box::new(Counting(counter.clone())));

        let asset = Asset::spawn(spec_for(path, Arc::new(engine)));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let asset = asset.clone();
                tokio::spawn(async move { asset.load(None).await.unwrap() })
            })
            .collect();
        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        assert!(results.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_pipeline_rejects_loads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.scss");
        fs::write(&path, "body { color: ; }").unwrap();

        let asset = Asset::spawn(spec_for(path, Arc::new(ConversionEngine::default())));
        let result = asset.load(None).await;

        assert!(matches!(result, Err(PipelineError::Failed { .. })));
        assert_eq!(asset.state(), AssetState::Failed);

        // Later calls reject too instead of hanging.
        assert!(asset.load(None).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_file_rejects_loads() {
        let dir = TempDir::new().unwrap();
        let asset = Asset::spawn(spec_for(
            dir.path().join("absent.txt"),
            Arc::new(ConversionEngine::default()),
        ));
        assert!(asset.load(None).await.is_err());
    }

    #[tokio::test]
    async fn test_template_vars_merged_over_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.ejs");
        fs::write(&path, "<p>{{ site }}:{{ title }}</p>").unwrap();

        let mut defaults = VarBag::new();
        defaults.insert("site".into(), json!("example"));
        defaults.insert("title".into(), json!("default"));

        let mut spec = spec_for(path, Arc::new(ConversionEngine::default()));
        spec.defaults = Arc::new(defaults);
        let asset = Asset::spawn(spec);

        let mut vars = VarBag::new();
        vars.insert("title".into(), json!("about"));

        let with_override = asset.load(Some(&vars)).await.unwrap();
        let without = asset.load(None).await.unwrap();

        assert_eq!(with_override, b"<p>example:about</p>");
        assert_eq!(without, b"<p>example:default</p>");
    }

    #[tokio::test]
    async fn test_raw_subtree_short_circuits() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vendor.js");
        let source = "function  pretty ( ) {   }";
        fs::write(&path, source).unwrap();

        let mut spec = spec_for(path, Arc::new(ConversionEngine::default()));
        spec.raw = true;
        let asset = Asset::spawn(spec);

        assert_eq!(asset.load(None).await.unwrap(), source.as_bytes());
        assert!(!asset.is_minified());
    }

    #[tokio::test]
    async fn test_status_override() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("404.html");
        fs::write(&path, "<h1>gone</h1>").unwrap();

        let asset = Asset::spawn(spec_for(path, Arc::new(ConversionEngine::default())));
        assert_eq!(asset.status(), None);
        asset.set_status(404);
        assert_eq!(asset.status(), Some(404));
    }
}
