// src/livereload/mod.rs

//! Live-reload server for `watch` mode.
//!
//! Browsers subscribe to `GET /livereload` (server-sent events) and receive
//! `event: reload` with the root-relative path of every changed output file
//! matching `[livereload].watch` and not `[livereload].exclude`.
//! `GET /livereload.js` serves a client snippet that reloads the page.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
    routing::get,
};
use futures::Stream;
use notify::{RecursiveMode, Watcher};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::LiveReloadSettings;
use crate::watch::TaskWatchProfile;
use crate::watch::debounce::DebouncedWatcher;
use crate::watch::path_utils::relative_str;

const CLIENT_SCRIPT: &str = r#"(function () {
  var source = new EventSource("/livereload");
  source.addEventListener("reload", function (event) {
    if (/\.css$/.test(event.data)) {
      var links = document.querySelectorAll('link[rel="stylesheet"]');
      for (var i = 0; i < links.length; i++) {
        var href = links[i].href.replace(/[?&]livereload=\d+/, "");
        links[i].href = href + (href.indexOf("?") < 0 ? "?" : "&") + "livereload=" + Date.now();
      }
      return;
    }
    window.location.reload();
  });
})();
"#;

const OUTPUT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Running live-reload server. Dropping it stops the server and the output
/// watcher.
pub struct LiveReloadHandle {
    local_addr: SocketAddr,
    tx: broadcast::Sender<String>,
    server: JoinHandle<()>,
    _watcher: Option<DebouncedWatcher>,
}

impl std::fmt::Debug for LiveReloadHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveReloadHandle")
            .field("local_addr", &self.local_addr)
            .field("subscribers", &self.tx.receiver_count())
            .finish_non_exhaustive()
    }
}

impl LiveReloadHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Push a reload for `rel_path` to every connected browser. Returns the
    /// number of subscribers reached.
    pub fn notify_change(&self, rel_path: &str) -> usize {
        self.tx.send(rel_path.to_string()).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Drop for LiveReloadHandle {
    fn drop(&mut self) {
        self.server.abort();
    }
}

#[derive(Clone)]
struct ServerState {
    tx: broadcast::Sender<String>,
}

/// Bind the server on `settings.host:settings.port` and start watching
/// `root` for output changes. Port `0` binds an ephemeral port.
pub async fn start(root: &Path, settings: &LiveReloadSettings) -> Result<LiveReloadHandle> {
    let (tx, _) = broadcast::channel(64);

    let addr = format!("{}:{}", settings.host, settings.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding live reload server on {addr}"))?;
    let local_addr = listener.local_addr()?;

    let app = router(ServerState { tx: tx.clone() });
    let server = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            warn!("live reload server stopped: {err}");
        }
    });
    info!(%local_addr, "live reload server listening");

    let watcher = match watch_outputs(root, settings, tx.clone()) {
        Ok(watcher) => Some(watcher),
        Err(err) => {
            warn!("live reload output watcher unavailable: {err:#}");
            None
        }
    };

    Ok(LiveReloadHandle {
        local_addr,
        tx,
        server,
        _watcher: watcher,
    })
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route("/livereload", get(events))
        .route("/livereload.js", get(client_script))
        .fallback(not_found)
        .with_state(state)
}

async fn events(
    State(state): State<ServerState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.tx.subscribe();
    let stream = futures::stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(path) => {
                    let event = Event::default().event("reload").data(path);
                    return Some((Ok(event), rx));
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "live reload subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn client_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        CLIENT_SCRIPT,
    )
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "not found")
}

/// Only content changes count; `markup` reads every destination file to
/// compare it, and those reads must not reload browsers.
fn watch_outputs(
    root: &Path,
    settings: &LiveReloadSettings,
    tx: broadcast::Sender<String>,
) -> Result<DebouncedWatcher> {
    let root: PathBuf = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    let filter = TaskWatchProfile::new(
        "livereload",
        Vec::new(),
        &settings.watch,
        &settings.exclude,
        false,
    )?;

    let event_root = root.clone();
    let mut watcher = DebouncedWatcher::new("livereload", OUTPUT_DEBOUNCE, move |paths| {
        for path in paths {
            let Some(rel) = relative_str(&event_root, &path) else {
                continue;
            };
            if filter.matches(&rel) {
                debug!(path = %rel, "output changed; reloading browsers");
                let _ = tx.send(rel);
            }
        }
    })?;

    watcher
        .watcher()
        .watch(&root, RecursiveMode::Recursive)
        .with_context(|| format!("watching {} for live reload", root.display()))?;

    Ok(watcher)
}
