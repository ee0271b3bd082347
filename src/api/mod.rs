//! Pitchside Report API
//!
//! HTTP API for the diagnostics session, built with Axum.
//!
//! # Endpoints
//!
//! ## Diagnostics
//! - `GET /api/v1/diagnostics/report` - Current report
//! - `GET /api/v1/diagnostics/export` - Report download (`error_report_<ms>.json`)
//! - `GET /api/v1/diagnostics/summary` - Per-kind counts
//! - `DELETE /api/v1/diagnostics` - Clear session and persisted logs
//! - `POST /api/v1/diagnostics/errors` - Record an event forwarded by a front-end
//! - `POST /api/v1/diagnostics/api-calls` - Record an API call forwarded by a front-end
//!
//! ## Dashboard
//! - `GET /api/v1/dashboard/status` - Poller refresh status
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health` - Full health status
//!
//! # Example
//!
//! ```rust,ignore
//! use pitchside::api::{serve, ApiConfig, AppState};
//! use pitchside::capture::DiagnosticsService;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = Arc::new(DiagnosticsService::in_memory());
//!     let config = ApiConfig::default();
//!
//!     let state = AppState::new(service, config.clone());
//!     serve(state, &config).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::{ApiConfig, AppState};

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Diagnostics routes
        .route("/diagnostics", delete(routes::diagnostics::clear_logs))
        .route("/diagnostics/report", get(routes::diagnostics::get_report))
        .route("/diagnostics/export", get(routes::diagnostics::export_report))
        .route("/diagnostics/summary", get(routes::diagnostics::get_summary))
        .route("/diagnostics/errors", post(routes::diagnostics::ingest_error))
        .route("/diagnostics/api-calls", post(routes::diagnostics::ingest_api_call))
        // Dashboard routes
        .route("/dashboard/status", get(routes::dashboard::get_status))
        .layer(DefaultBodyLimit::max(state.config.max_body_size));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/", get(routes::health::full_health));

    let cors = cors_layer(&state.config.cors_origins);

    // Create shared state
    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(shared_state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Start the API server, stopping on Ctrl+C or SIGTERM
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    serve_with_shutdown(state, config, shutdown_signal()).await
}

/// Start the API server, stopping when `shutdown` resolves
pub async fn serve_with_shutdown(
    state: AppState,
    config: &ApiConfig,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Pitchside report API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Pitchside report API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
