//! Extractor HTTP surface.
//!
//! Three operations: `POST /extract` accepts a run request and returns
//! immediately while the run proceeds in a background task, `POST
//! /shutdown` sets the cooperative shutdown flag, and `GET /health` is a
//! shallow liveness probe.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use ladle_core::RunRequest;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::run::Extractor;

/// Health check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
}

/// Shared application state for all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    extractor: Arc<Extractor>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("extractor", &"<Extractor>")
            .finish()
    }
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Accepts a run request and launches the extraction asynchronously.
///
/// The response is immediate; progress and failures surface through logs,
/// telemetry, and the manifest.
async fn extract(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RunRequest>,
) -> impl IntoResponse {
    if state.extractor.is_shutting_down() {
        return (StatusCode::SERVICE_UNAVAILABLE, "shutting down");
    }

    tracing::info!(
        date = %request.date,
        max_offset = request.max_offset,
        "extraction requested"
    );

    let extractor = Arc::clone(&state.extractor);
    tokio::spawn(async move {
        if let Err(e) = extractor.run(request).await {
            tracing::error!(error = %e, "extraction run failed");
        }
    });

    (StatusCode::OK, "Extractor started")
}

async fn shutdown(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.extractor.request_shutdown();
    tracing::info!("shutdown requested");
    (StatusCode::OK, "shutdown requested")
}

/// The extractor HTTP server.
pub struct Server {
    config: Config,
    extractor: Arc<Extractor>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("extractor", &"<Extractor>")
            .finish()
    }
}

impl Server {
    /// Creates a server over a configured extractor.
    #[must_use]
    pub fn new(config: Config, extractor: Arc<Extractor>) -> Self {
        Self { config, extractor }
    }

    fn create_router(&self) -> Router {
        let state = Arc::new(AppState {
            config: self.config.clone(),
            extractor: Arc::clone(&self.extractor),
        });

        Router::new()
            .route("/health", get(health))
            .route("/extract", post(extract))
            .route("/shutdown", post(shutdown))
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

        tracing::info!(http_port = self.config.http_port, "starting extractor server");

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
    pub fn test_router(&self) -> Router {
        self.create_router()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use ladle_core::{MemoryBackend, MemorySink};

    use crate::feed::{RetryPolicy, SourceFeed};
    use crate::notify::RecordingNotifier;

    struct EmptyFeed;

    #[async_trait::async_trait]
    impl SourceFeed for EmptyFeed {
        async fn fetch_page(&self, _limit: u64, _offset: u64) -> crate::error::Result<bytes::Bytes> {
            Ok(bytes::Bytes::from("[]"))
        }
    }

    fn test_server() -> Server {
        let storage = Arc::new(MemoryBackend::new());
        let extractor = Extractor::new(
            storage,
            Arc::new(EmptyFeed),
            Arc::new(MemorySink::new()),
            Arc::new(RecordingNotifier::new()),
        )
        .with_retry_policy(RetryPolicy {
            max_attempts: 1,
            initial_backoff: std::time::Duration::from_millis(1),
        });

        Server::new(
            Config {
                debug: true,
                ..Config::default()
            },
            Arc::new(extractor),
        )
    }

    #[tokio::test]
    async fn health_endpoint_reports_ok() -> Result<()> {
        let router = test_server().test_router();

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .context("build request")?;
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .context("read response body")?;
        let health: HealthResponse = serde_json::from_slice(&body).context("parse JSON body")?;
        assert_eq!(health.status, "ok");
        Ok(())
    }

    #[tokio::test]
    async fn extract_accepts_and_returns_immediately() -> Result<()> {
        let router = test_server().test_router();

        let request = Request::builder()
            .method("POST")
            .uri("/extract")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"date":"2025-03-30","max_offset":1000}"#))
            .context("build request")?;
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .context("read response body")?;
        assert_eq!(&body[..], b"Extractor started");
        Ok(())
    }

    #[tokio::test]
    async fn extract_rejects_malformed_body() -> Result<()> {
        let router = test_server().test_router();

        let request = Request::builder()
            .method("POST")
            .uri("/extract")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .context("build request")?;
        let response = router.oneshot(request).await.unwrap();

        assert!(response.status().is_client_error());
        Ok(())
    }

    #[tokio::test]
    async fn shutdown_flag_blocks_new_runs() -> Result<()> {
        let server = test_server();

        let request = Request::builder()
            .method("POST")
            .uri("/shutdown")
            .body(Body::empty())
            .context("build request")?;
        let response = server
            .test_router()
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let request = Request::builder()
            .method("POST")
            .uri("/extract")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"date":"2025-03-30"}"#))
            .context("build request")?;
        let response = server
            .test_router()
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        Ok(())
    }
}
