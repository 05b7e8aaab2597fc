//! HTTP surface.
//!
//! Routes:
//! - `POST /parse`    multipart `file` → `{result, fileName}` or, with
//!   `?format=pdf`, the report as a PDF attachment
//! - `GET  /parse`    liveness message for the upload endpoint
//! - `POST /upload`   older form of `/parse` answering `{message}`
//! - `POST /feedback` `{firstName, lastName, opinion}` → `{success: true}`
//! - `GET|POST /test` echo endpoints
//! - `GET  /features` product feature cards
//! - `GET  /health`   status and version
//!
//! Every error leaves as `{error, code}` with the status from
//! [`ReportError::status_code`].

pub mod routes;

use crate::config::{AnalysisConfig, ServerConfig};
use crate::error::ReportError;
use crate::feedback::FeedbackStore;
use crate::pipeline::llm::ChatClient;
use axum::extract::DefaultBodyLimit;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Allowance for multipart boundaries and headers on top of the file limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

// ── State ────────────────────────────────────────────────────────────────────

/// Shared handler state. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AnalysisConfig,
    chat: Option<Arc<dyn ChatClient>>,
    feedback: Arc<dyn FeedbackStore>,
}

impl AppState {
    /// `chat` may be `None` when no vendor is configured; `/parse` then
    /// answers 503 while the other routes keep working.
    pub fn new(
        config: AnalysisConfig,
        chat: Option<Arc<dyn ChatClient>>,
        feedback: Arc<dyn FeedbackStore>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                chat,
                feedback,
            }),
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.inner.config
    }

    pub fn chat(&self) -> Result<&dyn ChatClient, ReportError> {
        self.inner
            .chat
            .as_deref()
            .ok_or_else(|| ReportError::ProviderNotConfigured {
                provider: "auto".to_string(),
                hint: "Set PERPLEXITY_API_KEY or OPENAI_API_KEY and restart the server."
                    .to_string(),
            })
    }

    pub fn feedback(&self) -> &dyn FeedbackStore {
        self.inner.feedback.as_ref()
    }
}

// ── Router ───────────────────────────────────────────────────────────────────

pub fn router(state: AppState) -> Router {
    let body_limit = state.config().max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/parse", post(routes::parse).get(routes::parse_status))
        .route("/upload", post(routes::upload).get(routes::upload_status))
        .route("/feedback", post(routes::submit_feedback))
        .route("/test", get(routes::test_get).post(routes::test_post))
        .route("/features", get(routes::features))
        .route("/health", get(routes::health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind `config.bind` and serve until Ctrl-C or SIGTERM.
pub async fn serve(config: &ServerConfig, state: AppState) -> Result<(), ReportError> {
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| ReportError::Internal(format!("failed to bind {}: {e}", config.bind)))?;
    info!("docreport listening on {}", config.bind);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ReportError::Internal(format!("server error: {e}")))?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting graceful shutdown..."),
    }
}

// ── Error response ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

impl IntoResponse for ReportError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("{} ({})", self, self.code());
        } else {
            warn!("Rejected request: {}", self);
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: self.code(),
        });
        (status, body).into_response()
    }
}
