//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use crate::capture::{ApiCallRecord, CaptureStats, DiagnosticEvent, EventKind};
use crate::dashboard::ResourceStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================
// INGEST DTOs
// ============================================

/// Diagnostic event forwarded by a front-end
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestErrorRequest {
    /// One of the closed set of kinds, e.g. "javascript-error"
    pub kind: String,
    pub message: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub column: Option<u32>,
    #[serde(default)]
    pub stack: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
    /// Defaults to receipt time
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl IngestErrorRequest {
    /// Validate the kind and build the event
    pub fn into_event(self) -> Result<DiagnosticEvent, String> {
        let kind: EventKind = self.kind.parse()?;

        let mut event = DiagnosticEvent::new(kind, self.message);
        event.filename = self.filename;
        event.line = self.line;
        event.column = self.column;
        event.stack = self.stack;
        event.url = self.url;
        event.status = self.status;
        if let Some(ts) = self.timestamp {
            event.timestamp = ts;
        }
        Ok(event)
    }
}

/// API call forwarded by a front-end
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestApiCallRequest {
    pub url: String,
    #[serde(default)]
    pub method: Option<String>,
    pub status: u16,
    #[serde(default)]
    pub status_text: Option<String>,
    pub duration_ms: u64,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl IngestApiCallRequest {
    pub fn into_record(self) -> Result<ApiCallRecord, String> {
        if self.url.trim().is_empty() {
            return Err("url must not be empty".to_string());
        }
        if !(100..=599).contains(&self.status) {
            return Err(format!("invalid HTTP status: {}", self.status));
        }

        let mut record = ApiCallRecord::new(self.url, self.method.as_deref(), self.status, self.duration_ms)
            .status_text(self.status_text.unwrap_or_default());
        if let Some(ts) = self.timestamp {
            record = record.at(ts);
        }
        Ok(record)
    }
}

/// Ingest response
#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    /// Status: "ok"
    pub status: String,
    /// Events recorded this session after the ingest
    pub session_errors: usize,
    /// API calls recorded this session after the ingest
    pub session_api_calls: usize,
}

// ============================================
// SUMMARY DTOs
// ============================================

/// Per-kind summary of the current session
#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub session_id: String,
    pub stats: CaptureStats,
    pub kinds: BTreeMap<String, usize>,
    pub failed_api_calls: usize,
}

/// Dashboard refresh status
#[derive(Debug, Serialize)]
pub struct DashboardStatusResponse {
    pub enabled: bool,
    pub resources: Vec<ResourceStatus>,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status: "healthy" or "degraded"
    pub status: String,
    /// Diagnostics session id
    pub session_id: String,
    /// Persistence status: "ok" or "failing"
    pub persistence: String,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Version string
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_error_rejects_unknown_kind() {
        let req: IngestErrorRequest =
            serde_json::from_str(r#"{"kind": "warning", "message": "x"}"#).unwrap();
        assert!(req.into_event().is_err());
    }

    #[test]
    fn test_ingest_error_keeps_location() {
        let req: IngestErrorRequest = serde_json::from_str(
            r#"{"kind": "javascript-error", "message": "x is undefined",
                "filename": "LineupBuilder.jsx", "line": 47, "column": 12}"#,
        )
        .unwrap();
        let event = req.into_event().unwrap();
        assert_eq!(event.kind, EventKind::Uncaught);
        assert_eq!(event.line, Some(47));
        assert_eq!(event.filename.as_deref(), Some("LineupBuilder.jsx"));
    }

    #[test]
    fn test_ingest_api_call_validation() {
        let req: IngestApiCallRequest =
            serde_json::from_str(r#"{"url": "/api/lineup", "status": 999, "durationMs": 3}"#).unwrap();
        assert!(req.into_record().is_err());

        let req: IngestApiCallRequest = serde_json::from_str(
            r#"{"url": "/api/lineup", "status": 404, "statusText": "Not Found", "durationMs": 3}"#,
        )
        .unwrap();
        let record = req.into_record().unwrap();
        assert_eq!(record.method, "GET");
        assert!(!record.ok);
    }
}
