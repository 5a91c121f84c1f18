//! Trigger HTTP surface.
//!
//! Four operations: `POST /run` forwards a run request to the extractor,
//! `POST /clean` is the generic event ingress (the name is historical —
//! the cleaner was its first poster), `POST /purge` empties the
//! completion cache, and `GET /health` is a liveness probe.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router as AxumRouter;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use ladle_core::RunRequest;
use ladle_core::observability::routing_span;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::routing::{IncomingEvent, Router};

/// Health check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Server time.
    pub time: DateTime<Utc>,
}

/// Shared application state for all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    router: Arc<Router>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("router", &self.router)
            .finish()
    }
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        time: Utc::now(),
    })
}

/// Starts a pipeline run by forwarding the request to the extractor.
///
/// Transport failures map to `502`; the caller can retry safely because
/// the extractor's checkpoint makes duplicate starts idempotent.
async fn run(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RunRequest>,
) -> impl IntoResponse {
    match state.router.start_run(&request).await {
        Ok(()) => (StatusCode::OK, "pipeline started".to_string()),
        Err(e) => {
            tracing::error!(error = %e, "failed to start pipeline");
            (StatusCode::BAD_GATEWAY, format!("failed to start extractor: {e}"))
        }
    }
}

/// The generic event ingress.
///
/// Well-formed events always get `200`, duplicates included; only a
/// malformed body is a client error.
async fn clean(
    State(state): State<Arc<AppState>>,
    Json(incoming): Json<IncomingEvent>,
) -> impl IntoResponse {
    let span = routing_span(&incoming.event, &incoming.date);
    let disposition = state.router.handle(&incoming).instrument(span).await;
    (StatusCode::OK, disposition.message())
}

async fn purge(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.router.purge();
    (StatusCode::OK, "cache cleared")
}

/// The trigger HTTP server.
pub struct Server {
    config: Config,
    router: Arc<Router>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("router", &self.router)
            .finish()
    }
}

impl Server {
    /// Creates a server over a configured event router.
    #[must_use]
    pub fn new(config: Config, router: Arc<Router>) -> Self {
        Self { config, router }
    }

    fn create_router(&self) -> AxumRouter {
        let state = Arc::new(AppState {
            config: self.config.clone(),
            router: Arc::clone(&self.router),
        });

        AxumRouter::new()
            .route("/health", get(health))
            .route("/run", post(run))
            .route("/clean", post(clean))
            .route("/purge", post(purge))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Starts the server and blocks until shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot bind or the server fails.
    pub async fn serve(&self) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let router = self.create_router();

        tracing::info!(http_port = self.config.http_port, "starting trigger server");

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("failed to bind to {addr}: {e}")))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::Config(format!("server error: {e}")))?;

        Ok(())
    }

    /// Creates a router without binding a port, for integration tests.
    #[doc(hidden)]
    #[must_use]
    pub fn test_router(&self) -> AxumRouter {
        self.create_router()
    }
}
