//! assetpipe - an in-memory asset pipeline for websites.
//!
//! Compiles a directory tree of heterogeneous sources (templates, component
//! scripts, style preprocessors, images, static files) into a live table of
//! servable and persistable assets:
//!
//! ```ignore
//! let registry = Registry::build("pages", BuildOptions::default()).await?;
//! let handler = registry.serve(ServeOptions::default());
//! // ... hand requests to `handler.handle(method, path, vars).await`
//! registry.save("dist", None).await?;
//! ```
//!
//! Each source file gets its own asynchronous pipeline
//! (fetch → convert → minify → ready); `Asset::load` suspends until the
//! pipeline resolves. With `watch` enabled, filesystem changes trigger a
//! full rebuild that is swapped into the existing route table in place and
//! announced to browsers over a WebSocket push channel.

mod asset;
mod convert;
mod error;
pub mod logger;
mod mime;
mod minify;
mod options;
mod registry;
mod route;
mod save;
mod serve;
mod vars;
mod watch;

pub use asset::{Asset, AssetContent, AssetState};
pub use convert::{Converted, Converter, ConversionEngine, RenderFn};
pub use error::PipelineError;
pub use minify::{MinificationEngine, Minifier};
pub use options::BuildOptions;
pub use registry::{Engines, Registry, RouteTable};
pub use serve::{ServeHandler, ServeOptions, ServedResponse};
pub use vars::{VarBag, merge_vars};
pub use watch::{ReloadServer, WatchSession};
