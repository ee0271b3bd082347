//! Dashboard REST API Client
//!
//! Typed wrappers over the analytics dashboard's REST resources. Every call
//! goes through an [`ObservedClient`], so its traffic lands in capture.
//! Payloads are passed through as JSON; the server owns their shape.

use crate::capture::DiagnosticsService;
use crate::http::{DiagnosticsInterceptor, ObservedClient, TracingInterceptor};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Configuration for the dashboard client
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Base URL including the API prefix (e.g., "http://localhost:8000/api")
    pub base_url: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

/// Lineup query filters; `All` and empty values are left out of the query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineupFilter {
    pub date: Option<String>,
    pub status: Option<String>,
    pub team: Option<String>,
    pub sport: Option<String>,
    /// Ask the server to refresh stats before answering
    pub refresh: bool,
}

impl LineupFilter {
    /// Encoded query string including the leading `?`, or empty
    pub fn to_query(&self) -> String {
        let mut params = Vec::new();

        let fields = [
            ("date", &self.date),
            ("status", &self.status),
            ("team", &self.team),
            ("sport", &self.sport),
        ];
        for (name, value) in fields {
            if let Some(v) = value.as_deref().filter(|v| !v.is_empty() && *v != "All") {
                params.push(format!("{}={}", name, urlencoding::encode(v)));
            }
        }
        if self.refresh {
            params.push("refresh=true".to_string());
        }

        if params.is_empty() {
            String::new()
        } else {
            format!("?{}", params.join("&"))
        }
    }
}

/// Lineup payload, accepting both the wrapped and the bare-array form
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Lineup {
    #[serde(default)]
    pub lineup: Vec<Value>,
    #[serde(default)]
    pub teams: Vec<String>,
    #[serde(default)]
    pub sports: Vec<String>,
}

impl Lineup {
    fn from_value(value: Value) -> Result<Self, DashboardError> {
        match value {
            Value::Array(players) => Ok(Lineup {
                lineup: players,
                ..Default::default()
            }),
            other => serde_json::from_value(other).map_err(|e| DashboardError::Decode(e.to_string())),
        }
    }
}

/// Dashboard REST API client
pub struct DashboardClient {
    http: ObservedClient,
    config: DashboardConfig,
}

impl DashboardClient {
    /// Create a client whose calls are logged and, if `service` is given, captured
    pub fn new(
        config: DashboardConfig,
        service: Option<Arc<DiagnosticsService>>,
    ) -> Result<Self, DashboardError> {
        let inner = Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .user_agent(crate::capture::default_user_agent())
            .build()?;

        let mut http = ObservedClient::new(inner).with(Arc::new(TracingInterceptor));
        if let Some(service) = service {
            http = http.with(Arc::new(DiagnosticsInterceptor::new(service)));
        }

        tracing::debug!(
            base_url = %config.base_url,
            interceptors = ?http.interceptor_names(),
            "Dashboard client ready"
        );

        Ok(Self { http, config })
    }

    /// Create a client over an already assembled observed client
    pub fn with_client(config: DashboardConfig, http: ObservedClient) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Check that the dashboard API answers
    pub async fn health(&self) -> Result<(), DashboardError> {
        self.get_json("/health").await.map(|_| ())
    }

    /// GET /predictions
    pub async fn predictions(&self) -> Result<Value, DashboardError> {
        self.get_json("/predictions").await
    }

    /// POST /predict - ask the server to run the prediction model
    pub async fn run_prediction(&self) -> Result<Value, DashboardError> {
        self.post_json("/predict", &Value::Null).await
    }

    /// GET /lineup with filters
    pub async fn lineup(&self, filter: &LineupFilter) -> Result<Lineup, DashboardError> {
        let value = self.get_json(&format!("/lineup{}", filter.to_query())).await?;
        Lineup::from_value(value)
    }

    /// POST /lineup/save
    pub async fn save_lineup(&self, players: &[Value]) -> Result<Value, DashboardError> {
        self.post_json("/lineup/save", &players).await
    }

    /// GET /analytics
    pub async fn analytics(&self) -> Result<Value, DashboardError> {
        self.get_json("/analytics").await
    }

    /// GET /shap - model explainability values
    pub async fn shap(&self) -> Result<Value, DashboardError> {
        self.get_json("/shap").await
    }

    /// GET /settings, unwrapping the `{"status": ..., "settings": {...}}` envelope
    pub async fn settings(&self) -> Result<Value, DashboardError> {
        let mut value = self.get_json("/settings").await?;
        match value.get_mut("settings") {
            Some(settings) => Ok(settings.take()),
            None => Ok(value),
        }
    }

    /// POST /feedback
    pub async fn feedback(&self, feedback: &Value) -> Result<Value, DashboardError> {
        self.post_json("/feedback", feedback).await
    }

    async fn get_json(&self, path: &str) -> Result<Value, DashboardError> {
        let response = self
            .http
            .get(&self.url(path))
            .send()
            .await
            .map_err(map_transport_error)?;
        read_json(response).await
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Value, DashboardError> {
        let response = self
            .http
            .post(&self.url(path))
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;
        read_json(response).await
    }
}

fn map_transport_error(e: reqwest::Error) -> DashboardError {
    if e.is_timeout() {
        DashboardError::Timeout
    } else if e.is_connect() {
        DashboardError::Unavailable
    } else {
        DashboardError::Request(e)
    }
}

async fn read_json(response: reqwest::Response) -> Result<Value, DashboardError> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(DashboardError::ApiError {
            status: status.as_u16(),
            message: text,
        });
    }

    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&bytes).map_err(|e| DashboardError::Decode(e.to_string()))
}

// ============================================
// Errors
// ============================================

/// Errors that can occur when talking to the dashboard API
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Dashboard API unavailable")]
    Unavailable,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Request timeout")]
    Timeout,

    #[error("Invalid response body: {0}")]
    Decode(String),
}
