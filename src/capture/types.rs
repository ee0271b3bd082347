//! Core record types for diagnostics capture
//!
//! - `DiagnosticEvent`: one recorded anomaly (panic, failed task, error log, failed call)
//! - `ApiCallRecord`: one observed outbound HTTP call with timing
//! - `ErrorReport`: exportable snapshot of a session
//!
//! Field names serialize in camelCase so stored logs stay readable by the
//! dashboard front-end that writes the same keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of diagnostic event kinds
///
/// The wire names are the ones the dashboard front-end has always stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Uncaught failure (a panic in this process)
    #[serde(rename = "javascript-error")]
    Uncaught,
    /// Asynchronous failure nobody observed
    #[serde(rename = "unhandled-rejection")]
    UnhandledRejection,
    /// Error explicitly logged by application code
    #[serde(rename = "console-error")]
    ConsoleError,
    /// HTTP response with a failure status
    #[serde(rename = "api-error")]
    ApiError,
    /// Transport failure, no response received
    #[serde(rename = "fetch-error")]
    FetchError,
}

impl EventKind {
    /// Get all kinds for iteration
    pub fn all() -> &'static [EventKind] {
        &[
            EventKind::Uncaught,
            EventKind::UnhandledRejection,
            EventKind::ConsoleError,
            EventKind::ApiError,
            EventKind::FetchError,
        ]
    }

    /// Wire name of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Uncaught => "javascript-error",
            EventKind::UnhandledRejection => "unhandled-rejection",
            EventKind::ConsoleError => "console-error",
            EventKind::ApiError => "api-error",
            EventKind::FetchError => "fetch-error",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown event kind: {}", s))
    }
}

/// One entry in the error log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl DiagnosticEvent {
    /// Create an event of the given kind stamped with the current time
    pub fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            message: message.into(),
            filename: None,
            line: None,
            column: None,
            stack: None,
            url: None,
            status: None,
        }
    }

    pub fn uncaught(message: impl Into<String>) -> Self {
        Self::new(EventKind::Uncaught, message)
    }

    pub fn unhandled_rejection(reason: impl Into<String>) -> Self {
        Self::new(EventKind::UnhandledRejection, reason)
    }

    pub fn console_error(message: impl Into<String>) -> Self {
        Self::new(EventKind::ConsoleError, message)
    }

    /// Event for a response that came back with a failure status
    pub fn api_error(
        url: impl Into<String>,
        method: &str,
        status: u16,
        status_text: &str,
    ) -> Self {
        let url = url.into();
        let message = if status_text.is_empty() {
            format!("{} {} returned {}", method, url, status)
        } else {
            format!("{} {} returned {} {}", method, url, status, status_text)
        };
        Self::new(EventKind::ApiError, message)
            .url(url)
            .status(status)
    }

    /// Event for a request that never produced a response
    pub fn fetch_error(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(EventKind::FetchError, error).url(url)
    }

    /// Builder method: source location
    pub fn location(mut self, filename: impl Into<String>, line: u32, column: u32) -> Self {
        self.filename = Some(filename.into());
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    /// Builder method: stack trace
    pub fn stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Builder method: request URL
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Builder method: HTTP status
    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Builder method: explicit timestamp
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// One entry in the network-call log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiCallRecord {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    pub status: u16,
    #[serde(default)]
    pub status_text: String,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
    pub ok: bool,
}

fn default_method() -> String {
    "GET".to_string()
}

impl ApiCallRecord {
    /// Create a record for a completed call; `ok` follows the status class
    pub fn new(url: impl Into<String>, method: Option<&str>, status: u16, duration_ms: u64) -> Self {
        let method = method
            .filter(|m| !m.is_empty())
            .map(|m| m.to_uppercase())
            .unwrap_or_else(default_method);

        Self {
            url: url.into(),
            method,
            status,
            status_text: String::new(),
            duration_ms,
            timestamp: Utc::now(),
            ok: (200..300).contains(&status),
        }
    }

    /// Builder method: reason phrase
    pub fn status_text(mut self, text: impl Into<String>) -> Self {
        self.status_text = text.into();
        self
    }

    /// Builder method: explicit timestamp
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Currently persisted (capped) sequences
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersistedLogs {
    pub errors: Vec<DiagnosticEvent>,
    pub api_calls: Vec<ApiCallRecord>,
}

/// Exportable snapshot of a diagnostics session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub generated: DateTime<Utc>,
    pub session_id: String,
    pub user_agent: String,
    pub url: String,
    pub errors: Vec<DiagnosticEvent>,
    pub api_calls: Vec<ApiCallRecord>,
    pub persisted: PersistedLogs,
}

impl ErrorReport {
    /// Count in-memory events per kind, in `EventKind::all()` order
    pub fn kind_counts(&self) -> Vec<(EventKind, usize)> {
        EventKind::all()
            .iter()
            .map(|kind| {
                let count = self.errors.iter().filter(|e| e.kind == *kind).count();
                (*kind, count)
            })
            .collect()
    }

    /// File name used when exporting this report
    pub fn file_name(&self) -> String {
        format!("error_report_{}.json", self.generated.timestamp_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_names() {
        let json = serde_json::to_string(&EventKind::Uncaught).unwrap();
        assert_eq!(json, "\"javascript-error\"");

        let kind: EventKind = serde_json::from_str("\"unhandled-rejection\"").unwrap();
        assert_eq!(kind, EventKind::UnhandledRejection);

        assert!(serde_json::from_str::<EventKind>("\"warning\"").is_err());
        assert_eq!("fetch-error".parse::<EventKind>().unwrap(), EventKind::FetchError);
    }

    #[test]
    fn test_event_skips_absent_fields() {
        let event = DiagnosticEvent::console_error("boom");
        let value = serde_json::to_value(&event).unwrap();
        let obj = value.as_object().unwrap();

        assert_eq!(obj["kind"], "console-error");
        assert_eq!(obj["message"], "boom");
        assert!(!obj.contains_key("filename"));
        assert!(!obj.contains_key("status"));
    }

    #[test]
    fn test_api_error_message() {
        let event = DiagnosticEvent::api_error("http://api/predictions", "GET", 500, "Internal Server Error");
        assert_eq!(event.kind, EventKind::ApiError);
        assert_eq!(event.status, Some(500));
        assert_eq!(event.url.as_deref(), Some("http://api/predictions"));
        assert_eq!(
            event.message,
            "GET http://api/predictions returned 500 Internal Server Error"
        );
    }

    #[test]
    fn test_api_call_record_defaults() {
        let record = ApiCallRecord::new("http://api/lineup", None, 200, 12);
        assert_eq!(record.method, "GET");
        assert!(record.ok);

        let record = ApiCallRecord::new("http://api/predict", Some("post"), 503, 40);
        assert_eq!(record.method, "POST");
        assert!(!record.ok);
    }

    #[test]
    fn test_api_call_record_camel_case() {
        let record = ApiCallRecord::new("http://api/shap", None, 404, 7).status_text("Not Found");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["statusText"], "Not Found");
        assert_eq!(value["durationMs"], 7);

        // Records written without a method fall back to GET
        let raw = r#"{"url":"/x","status":200,"durationMs":1,"timestamp":"2025-05-30T20:39:27Z","ok":true}"#;
        let parsed: ApiCallRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.method, "GET");
    }
}
