//! Layout server
//!
//! Serves the current layout of a JSON-file-backed graph over HTTP and reloads the
//! session whenever the store file changes on disk.
//!
//! - `GET /layout/{mode}`: layout view for `chronological` or `network`
//! - `POST /reload`: fetch the store again; a failure keeps the previous layout

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::{Path as UrlPath, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use notify::{Event, RecursiveMode, Watcher};
use serde::Serialize;
use tokio::sync::{Mutex, mpsc};
use tower_http::trace::TraceLayer;

use crate::classify::LayoutMode;
use crate::error::GraphResult;
use crate::session::{GraphSession, LayoutView, SessionState};
use crate::store::JsonFileStore;

/// Session plus the store it is loaded from
#[derive(Debug)]
pub struct ServerState {
    pub session: Mutex<GraphSession>,
    pub store: JsonFileStore,
}

impl ServerState {
    pub fn new(session: GraphSession, store: JsonFileStore) -> Self {
        Self {
            session: Mutex::new(session),
            store,
        }
    }

    /// Reload the session from the store
    pub async fn reload(&self) -> GraphResult<ReloadSummary> {
        let mut session = self.session.lock().await;
        session.load(&self.store).await?;
        Ok(ReloadSummary::of(&session))
    }
}

/// Response body of `POST /reload`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReloadSummary {
    pub state: SessionState,
    pub mode: LayoutMode,
    pub nodes: usize,
    pub edges: usize,
}

impl ReloadSummary {
    fn of(session: &GraphSession) -> Self {
        let (nodes, edges) = session
            .model()
            .map_or((0, 0), |m| (m.nodes.len(), m.edges.len()));
        Self {
            state: session.state(),
            mode: session.mode(),
            nodes,
            edges,
        }
    }
}

type SharedState = Arc<ServerState>;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/layout/{mode}", get(layout))
        .route("/reload", post(reload))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn layout(
    State(state): State<SharedState>,
    UrlPath(mode): UrlPath<String>,
) -> Result<Json<LayoutView>, (StatusCode, String)> {
    let mode: LayoutMode = mode.parse().map_err(|e| (StatusCode::BAD_REQUEST, e))?;

    let mut session = state.session.lock().await;
    // A network layout runs the whole simulation; keep it off the async worker
    let view = tokio::task::block_in_place(|| session.layout(mode).cloned());
    match view {
        Some(view) => Ok(Json(view)),
        None => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "graph not loaded, POST /reload to retry".to_string(),
        )),
    }
}

async fn reload(
    State(state): State<SharedState>,
) -> Result<Json<ReloadSummary>, (StatusCode, String)> {
    state
        .reload()
        .await
        .map(Json)
        .map_err(|e| (StatusCode::SERVICE_UNAVAILABLE, e.to_string()))
}

/// Watch `store_path` and reload `state` after each burst of changes
fn watch_store(store_path: &Path, state: SharedState) -> anyhow::Result<impl Watcher> {
    let (tx, mut rx) = mpsc::channel::<()>(1);

    let watched = store_path.to_path_buf();
    let mut watcher = notify::recommended_watcher(move |res: Result<Event, _>| {
        if let Ok(event) = res {
            let touches_store = event.paths.iter().any(|p| p.file_name() == watched.file_name());
            if touches_store && (event.kind.is_modify() || event.kind.is_create()) {
                let _ = tx.try_send(());
            }
        }
    })?;

    // Editors replace files instead of writing in place, so watch the directory
    let watch_dir = store_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;

    tokio::spawn(async move {
        while rx.recv().await.is_some() {
            // Let bursts of writes settle
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            while rx.try_recv().is_ok() {}

            match state.reload().await {
                Ok(summary) => tracing::info!(
                    nodes = summary.nodes,
                    edges = summary.edges,
                    "store changed, layout refreshed"
                ),
                Err(e) => tracing::warn!(error = %e, "store changed but reload failed"),
            }
        }
    });

    Ok(watcher)
}

/// Load the session, then serve it on `port` until interrupted
pub async fn serve(session: GraphSession, store: JsonFileStore, port: u16) -> anyhow::Result<()> {
    let store_path = store.path().to_path_buf();
    let state = Arc::new(ServerState::new(session, store));

    // Start even when the first load fails; POST /reload retries
    if let Err(e) = state.reload().await {
        tracing::warn!(error = %e, "initial load failed");
    }

    let _watcher = watch_store(&store_path, Arc::clone(&state))?;
    let app = router(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        store = %store_path.display(),
        "layout server running at http://localhost:{port}"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
