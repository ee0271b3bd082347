//! Diagnostics Routes
//!
//! - GET /api/v1/diagnostics/report - Current report as JSON
//! - GET /api/v1/diagnostics/export - Report as a downloadable file
//! - GET /api/v1/diagnostics/summary - Per-kind counts
//! - DELETE /api/v1/diagnostics - Clear session and persisted logs
//! - POST /api/v1/diagnostics/errors - Record a forwarded event
//! - POST /api/v1/diagnostics/api-calls - Record a forwarded API call

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::api::dto::{IngestApiCallRequest, IngestErrorRequest, IngestResponse, SummaryResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::capture::ErrorReport;

/// GET /api/v1/diagnostics/report
pub async fn get_report(State(state): State<Arc<AppState>>) -> Json<ErrorReport> {
    Json(state.service.generate_report())
}

/// GET /api/v1/diagnostics/export
///
/// Same report, served as `error_report_<epoch-millis>.json`.
pub async fn export_report(State(state): State<Arc<AppState>>) -> ApiResult<Response> {
    let report = state.service.generate_report();
    let body = serde_json::to_string_pretty(&report)
        .map_err(|e| ApiError::Internal(format!("Failed to serialize report: {}", e)))?;

    tracing::info!(
        errors = report.errors.len(),
        api_calls = report.api_calls.len(),
        "Serving diagnostics report download"
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", report.file_name()),
            ),
        ],
        Body::from(body),
    )
        .into_response())
}

/// GET /api/v1/diagnostics/summary
pub async fn get_summary(State(state): State<Arc<AppState>>) -> Json<SummaryResponse> {
    let report = state.service.generate_report();
    let kinds = report
        .kind_counts()
        .into_iter()
        .map(|(kind, count)| (kind.to_string(), count))
        .collect();
    let failed_api_calls = report.api_calls.iter().filter(|c| !c.ok).count();

    Json(SummaryResponse {
        session_id: report.session_id,
        stats: state.service.stats(),
        kinds,
        failed_api_calls,
    })
}

/// DELETE /api/v1/diagnostics
pub async fn clear_logs(State(state): State<Arc<AppState>>) -> ApiResult<StatusCode> {
    state.service.clear()?;
    tracing::info!("Diagnostics logs cleared");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/diagnostics/errors
pub async fn ingest_error(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IngestErrorRequest>,
) -> ApiResult<(StatusCode, Json<IngestResponse>)> {
    ensure_ingest_enabled(&state)?;

    let event = req.into_event().map_err(ApiError::Validation)?;
    state.service.log_error(event);

    Ok((StatusCode::CREATED, Json(ingest_response(&state))))
}

/// POST /api/v1/diagnostics/api-calls
pub async fn ingest_api_call(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IngestApiCallRequest>,
) -> ApiResult<(StatusCode, Json<IngestResponse>)> {
    ensure_ingest_enabled(&state)?;

    let record = req.into_record().map_err(ApiError::Validation)?;
    state.service.log_api_call(record);

    Ok((StatusCode::CREATED, Json(ingest_response(&state))))
}

fn ensure_ingest_enabled(state: &AppState) -> ApiResult<()> {
    if state.config.enable_ingest {
        Ok(())
    } else {
        Err(ApiError::Validation("Ingest is disabled".to_string()))
    }
}

fn ingest_response(state: &AppState) -> IngestResponse {
    let stats = state.service.stats();
    IngestResponse {
        status: "ok".to_string(),
        session_errors: stats.errors,
        session_api_calls: stats.api_calls,
    }
}
