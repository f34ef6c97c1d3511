//! Watch mode: rebuild on change, notify browsers.
//!
//! Every relevant filesystem event triggers a full rescan and rebuild into
//! the live route table; there is no per-file incremental path and no
//! debounce window. A failed rebuild keeps the previous table so the site
//! never goes dark mid-edit.

mod server;

use std::path::PathBuf;
use std::sync::Arc;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::PipelineError;
use crate::options::BuildOptions;
use crate::registry::{Engines, RouteTable, build_table};
use crate::vars::VarBag;
use crate::{debug, log};

pub use server::ReloadServer;

/// Everything a rebuild needs. Carried by the watch task so rebuilds take
/// exactly the same path as the initial build.
pub(crate) struct RebuildContext {
    pub root: PathBuf,
    pub options: BuildOptions,
    pub engines: Engines,
    pub defaults: Arc<VarBag>,
    pub table: RouteTable,
    pub server: Arc<ReloadServer>,
    /// Live-reload bootstrap injected into markup, bound to the server's
    /// actual port.
    pub inject: String,
}

/// A running watch session. Dropping it stops the filesystem watcher.
pub struct WatchSession {
    _watcher: RecommendedWatcher,
    server: Arc<ReloadServer>,
}

impl WatchSession {
    /// Register the watcher and start the rebuild task.
    pub(crate) fn start(ctx: RebuildContext) -> Result<Self, PipelineError> {
        // notify's callback is sync; bridge into tokio via a std channel
        // and a forwarding thread.
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })
        .map_err(watch_err)?;
        watcher
            .watch(&ctx.root, RecursiveMode::Recursive)
            .map_err(watch_err)?;

        let (async_tx, mut async_rx) = tokio::sync::mpsc::channel::<notify::Event>(64);
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => log!("watch"; "notify error: {e}"),
                }
            }
        });

        let server = ctx.server.clone();
        let watched = ctx.root.display().to_string();
        tokio::spawn(async move {
            while let Some(event) = async_rx.recv().await {
                if !affects_content(&event.kind) {
                    continue;
                }
                rebuild(&ctx, &event);
            }
        });

        log!("watch"; "watching {watched}, reload on port {}", server.port());
        Ok(Self {
            _watcher: watcher,
            server,
        })
    }

    pub fn reload_port(&self) -> u16 {
        self.server.port()
    }
}

/// Rescan and swap the table, then notify browsers. On failure the old
/// table stays in place.
fn rebuild(ctx: &RebuildContext, event: &notify::Event) {
    if let Some(path) = event.paths.first() {
        debug!("watch"; "change: {}", path.display());
    }

    match build_table(
        &ctx.root,
        &ctx.options,
        &ctx.engines,
        &ctx.defaults,
        Some(&ctx.inject),
    ) {
        Ok(map) => {
            let count = map.len();
            ctx.table.swap(map);
            crate::logger::status_success(&format!("updated {count} route(s)"));
            ctx.server.broadcast();
        }
        Err(e) => {
            crate::logger::status_error("rebuild failed, keeping previous routes", &e.to_string());
        }
    }
}

/// Events that can change served output. Metadata-only and access events
/// are ignored.
fn affects_content(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(modify) => !matches!(modify, notify::event::ModifyKind::Metadata(_)),
        _ => false,
    }
}

fn watch_err(e: notify::Error) -> PipelineError {
    PipelineError::Watch {
        message: e.to_string(),
    }
}

/// The markup snippet that connects the page to the reload channel and
/// reloads on any change notification.
pub(crate) fn bootstrap_snippet(port: u16) -> String {
    format!(
        "<script>(function(){{var c=function(){{\
         var s=new WebSocket(\"ws://localhost:{port}\");\
         s.onmessage=function(){{location.reload()}};\
         s.onclose=function(){{setTimeout(c,1000)}}\
         }};c()}})();</script>"
    )
}
