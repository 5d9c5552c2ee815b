//! Loopback HTTP server for serving cached avatars
//!
//! Binds 127.0.0.1 on an OS-assigned port and exposes a single route that
//! reads a cache file path from a query parameter and returns the file's
//! bytes. Requests are constrained to the cache directory: anything that
//! canonicalizes outside it is refused, so the server never becomes an
//! arbitrary local file reader.

use crate::error::{AvatarError, Result};
use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

struct ServeState {
    /// Canonicalized cache directory; served paths must stay inside it.
    cache_dir: PathBuf,
}

type SharedState = Arc<ServeState>;

#[derive(Deserialize)]
struct AvatarQuery {
    path: String,
}

pub struct LoopbackServer {
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl LoopbackServer {
    /// Bind an ephemeral loopback port and start serving the cache
    /// directory. Bind failures are surfaced so the caller can fall back to
    /// simple mode.
    pub async fn start(cache_dir: &Path) -> Result<Self> {
        let cache_dir = tokio::fs::canonicalize(cache_dir)
            .await
            .map_err(|e| AvatarError::Server(format!("cache dir unavailable: {}", e)))?;
        let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .map_err(|e| AvatarError::Server(format!("failed to bind loopback port: {}", e)))?;
        let addr = listener
            .local_addr()
            .map_err(|e| AvatarError::Server(format!("failed to read local addr: {}", e)))?;

        let router = create_router(Arc::new(ServeState { cache_dir }));
        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                warn!(error = %e, "Loopback avatar server exited");
            }
        });

        info!(addr = %addr, "Loopback avatar server listening");
        Ok(Self { addr, task })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn stop(&self) {
        self.task.abort();
    }
}

fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/avatar", get(serve_avatar))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn serve_avatar(
    State(state): State<SharedState>,
    Query(query): Query<AvatarQuery>,
) -> Response {
    let path = match tokio::fs::canonicalize(&query.path).await {
        Ok(p) => p,
        Err(e) => {
            debug!(path = %query.path, error = %e, "Requested avatar path not found");
            return StatusCode::NOT_FOUND.into_response();
        }
    };
    if !path.starts_with(&state.cache_dir) {
        warn!(path = %path.display(), "Refusing to serve file outside cache directory");
        return StatusCode::FORBIDDEN.into_response();
    }

    match tokio::fs::read(&path).await {
        Ok(data) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CACHE_CONTROL, "no-store")
            .body(Body::from(data))
            .unwrap(),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Failed to read avatar file");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}
