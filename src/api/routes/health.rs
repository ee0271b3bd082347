//! Health Routes
//!
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::HealthResponse;
use crate::api::state::AppState;

/// GET /health/live
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health
///
/// Degraded once any persisted write has failed this session; capture
/// itself keeps working in memory.
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let stats = state.service.stats();
    let persistence_ok = stats.persist_failures == 0;

    Json(HealthResponse {
        status: if persistence_ok { "healthy" } else { "degraded" }.to_string(),
        session_id: state.service.session_id().to_string(),
        persistence: if persistence_ok { "ok" } else { "failing" }.to_string(),
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
