//! The registry: scan a tree, build assets, hold the live route table.

mod scan;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::asset::{Asset, PipelineSpec};
use crate::convert::ConversionEngine;
use crate::error::PipelineError;
use crate::minify::MinificationEngine;
use crate::options::BuildOptions;
use crate::serve::{ServeHandler, ServeOptions};
use crate::vars::VarBag;
use crate::watch::{self, WatchSession};
use crate::{debug, log, route};

/// Shareable route → asset map with in-place atomic replacement.
///
/// Handles are cheap clones of the same table; a rebuild swaps the mapping
/// under every existing handle at once, so holders never observe a stale
/// table.
#[derive(Clone)]
pub struct RouteTable {
    inner: Arc<RwLock<FxHashMap<String, Arc<Asset>>>>,
}

impl RouteTable {
    fn new(map: FxHashMap<String, Arc<Asset>>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(map)),
        }
    }

    /// Look up an asset by exact route name.
    pub fn get(&self, name: &str) -> Option<Arc<Asset>> {
        self.inner.read().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Route names in sorted order.
    pub fn routes(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// A point-in-time copy of the mapping.
    pub fn snapshot(&self) -> Vec<(String, Arc<Asset>)> {
        self.inner
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Replace the entire mapping under one write lock.
    pub(crate) fn swap(&self, map: FxHashMap<String, Arc<Asset>>) {
        let mut guard = self.inner.write();
        guard.clear();
        guard.extend(map);
    }
}

/// The conversion and minification tables a registry builds with.
#[derive(Clone)]
pub struct Engines {
    pub convert: Arc<ConversionEngine>,
    pub minify: Arc<MinificationEngine>,
}

impl Default for Engines {
    fn default() -> Self {
        Self {
            convert: Arc::new(ConversionEngine::default()),
            minify: Arc::new(MinificationEngine::default()),
        }
    }
}

/// A built source tree: the live route table plus the context needed to
/// rebuild it.
pub struct Registry {
    root: PathBuf,
    options: BuildOptions,
    table: RouteTable,
    defaults: Arc<VarBag>,
    // Dropping the session stops the watcher.
    watch: Option<WatchSession>,
}

impl Registry {
    /// Scan `root` and build an asset for every discovered file.
    ///
    /// Returns as soon as every pipeline is started; individual assets
    /// finish in the background and `load()` waits for them. With
    /// `options.watch` the registry also starts the rebuild loop and the
    /// reload push channel.
    pub async fn build(
        root: impl Into<PathBuf>,
        options: BuildOptions,
    ) -> Result<Self, PipelineError> {
        Self::build_with_engines(root, options, Engines::default()).await
    }

    /// Like [`build`](Self::build) with caller-supplied engines, for
    /// projects that register extra converters or minifiers.
    pub async fn build_with_engines(
        root: impl Into<PathBuf>,
        options: BuildOptions,
        engines: Engines,
    ) -> Result<Self, PipelineError> {
        let root = root.into();
        let defaults = Arc::new(options.variables.clone());

        // The reload server binds first so the injected snippet carries the
        // actual port even when the configured one was taken.
        let server = if options.watch {
            Some(watch::ReloadServer::start(options.reload_port)?)
        } else {
            None
        };
        let inject = server
            .as_ref()
            .map(|s| watch::bootstrap_snippet(s.port()));

        let map = build_table(&root, &options, &engines, &defaults, inject.as_deref())?;
        log!("build"; "{} route(s) from {}", map.len(), root.display());
        let table = RouteTable::new(map);

        let session = match (server, inject) {
            (Some(server), Some(inject)) => Some(WatchSession::start(watch::RebuildContext {
                root: root.clone(),
                options: options.clone(),
                engines,
                defaults: defaults.clone(),
                table: table.clone(),
                server,
                inject,
            })?),
            _ => None,
        };

        Ok(Self {
            root,
            options,
            table,
            defaults,
            watch: session,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// A handle to the live route table. Stays current across rebuilds.
    pub fn table(&self) -> RouteTable {
        self.table.clone()
    }

    /// Look up an asset by route name.
    pub fn get(&self, route: &str) -> Option<Arc<Asset>> {
        self.table.get(route)
    }

    /// Load an asset's bytes by route name.
    pub async fn load(&self, route: &str, vars: Option<&VarBag>) -> Result<Vec<u8>, PipelineError> {
        let asset = self.get(route).ok_or_else(|| PipelineError::Failed {
            route: route.to_string(),
            message: "no such route".to_string(),
        })?;
        asset.load(vars).await
    }

    /// Build an HTTP-shaped request handler over the live table.
    pub fn serve(&self, options: ServeOptions) -> ServeHandler {
        ServeHandler::new(self.table(), options, self.options.production)
    }

    /// Materialize every asset under `out_dir`, using the canonical
    /// on-disk name for each source file.
    pub async fn save(&self, out_dir: &Path, vars: Option<&VarBag>) -> Result<(), PipelineError> {
        crate::save::save_all(&self.table, &self.root, out_dir, vars).await
    }

    /// Default variables merged into every render.
    pub fn defaults(&self) -> &VarBag {
        &self.defaults
    }

    /// Port of the live-reload channel when watch mode is active.
    pub fn reload_port(&self) -> Option<u16> {
        self.watch.as_ref().map(WatchSession::reload_port)
    }
}

/// Scan the tree and spawn one asset pipeline per file.
///
/// Shared between the initial build and watch-mode rebuilds so both take
/// the same path.
pub(crate) fn build_table(
    root: &Path,
    options: &BuildOptions,
    engines: &Engines,
    defaults: &Arc<VarBag>,
    inject: Option<&str>,
) -> Result<FxHashMap<String, Arc<Asset>>, PipelineError> {
    let files = scan::scan(root, options)?;
    let mut map = FxHashMap::default();

    for file in files {
        let route = route::derive(&file.relative, options.preserve_extensions);
        let asset = Asset::spawn(PipelineSpec {
            source: file.path,
            route: route.clone(),
            raw: options.is_raw(&file.relative),
            inject: inject.map(str::to_string),
            convert: engines.convert.clone(),
            minify: engines.minify.clone(),
            defaults: defaults.clone(),
        });
        if let Some(previous) = map.insert(route, asset) {
            debug!("build"; "route {} shadows {}", previous.route(), previous.source().display());
        }
    }

    Ok(map)
}
