//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use crate::capture::DiagnosticsService;
use crate::dashboard::DashboardPoller;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Diagnostics session served by this API
    pub service: Arc<DiagnosticsService>,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
    /// Dashboard poller (optional)
    pub poller: Option<Arc<DashboardPoller>>,
}

impl AppState {
    /// Create an AppState without a dashboard poller
    pub fn new(service: Arc<DiagnosticsService>, config: ApiConfig) -> Self {
        Self {
            service,
            config: Arc::new(config),
            start_time: Instant::now(),
            poller: None,
        }
    }

    /// Create an AppState that also reports dashboard refresh status
    pub fn with_poller(
        service: Arc<DiagnosticsService>,
        config: ApiConfig,
        poller: Arc<DashboardPoller>,
    ) -> Self {
        Self {
            poller: Some(poller),
            ..Self::new(service, config)
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
    /// Accept events and calls forwarded by browser front-ends
    pub enable_ingest: bool,
    /// Allowed CORS origins; empty means permissive
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8086,
            max_body_size: 1024 * 1024, // 1MB
            enable_ingest: true,
            cors_origins: Vec::new(),
        }
    }
}

impl ApiConfig {
    /// Create config with custom host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
