//! Dashboard Routes
//!
//! - GET /api/v1/dashboard/status - Refresh status of polled resources

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::DashboardStatusResponse;
use crate::api::state::AppState;

/// GET /api/v1/dashboard/status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<DashboardStatusResponse> {
    let Some(poller) = &state.poller else {
        return Json(DashboardStatusResponse {
            enabled: false,
            resources: Vec::new(),
        });
    };

    Json(DashboardStatusResponse {
        enabled: poller.is_enabled(),
        resources: poller.get_status().await,
    })
}
