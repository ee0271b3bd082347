//! Request interceptors
//!
//! An [`Interceptor`] observes each call made through an
//! [`ObservedClient`](crate::http::ObservedClient). Hooks get read-only views
//! and cannot change the request, the response, or the error handed back to
//! the caller.

use crate::capture::{ApiCallRecord, DiagnosticEvent, DiagnosticsService};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// What an interceptor sees about an outgoing request
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: String,
    pub url: String,
    pub started: Instant,
}

impl RequestContext {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            started: Instant::now(),
        }
    }

    /// Milliseconds since the request started
    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// What an interceptor sees about a completed response
#[derive(Debug, Clone)]
pub struct ResponseInfo {
    pub status: u16,
    pub status_text: String,
    pub ok: bool,
    pub duration_ms: u64,
}

impl ResponseInfo {
    pub fn from_status(status: reqwest::StatusCode, duration_ms: u64) -> Self {
        Self {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            ok: status.is_success(),
            duration_ms,
        }
    }
}

/// Observer hooks around one HTTP call
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Called before the request is sent
    async fn on_request(&self, _ctx: &RequestContext) {}

    /// Called when a response arrived, whatever its status
    async fn on_response(&self, _ctx: &RequestContext, _response: &ResponseInfo) {}

    /// Called when no response was produced
    async fn on_failure(&self, _ctx: &RequestContext, _error: &reqwest::Error) {}
}

/// Records every call into a [`DiagnosticsService`]
///
/// Each response yields one `ApiCallRecord`; a non-success status also
/// yields one `api-error`. A transport failure yields one `fetch-error`.
pub struct DiagnosticsInterceptor {
    service: Arc<DiagnosticsService>,
}

impl DiagnosticsInterceptor {
    pub fn new(service: Arc<DiagnosticsService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Interceptor for DiagnosticsInterceptor {
    fn name(&self) -> &str {
        "diagnostics"
    }

    async fn on_response(&self, ctx: &RequestContext, response: &ResponseInfo) {
        self.service.log_api_call(
            ApiCallRecord::new(
                ctx.url.clone(),
                Some(&ctx.method),
                response.status,
                response.duration_ms,
            )
            .status_text(response.status_text.clone()),
        );

        if !response.ok {
            self.service.log_error(DiagnosticEvent::api_error(
                ctx.url.clone(),
                &ctx.method,
                response.status,
                &response.status_text,
            ));
        }
    }

    async fn on_failure(&self, ctx: &RequestContext, error: &reqwest::Error) {
        self.service
            .log_error(DiagnosticEvent::fetch_error(ctx.url.clone(), error.to_string()));
    }
}

/// Logs each call at debug level, failures at warn
#[derive(Debug, Default)]
pub struct TracingInterceptor;

#[async_trait]
impl Interceptor for TracingInterceptor {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn on_request(&self, ctx: &RequestContext) {
        tracing::debug!(method = %ctx.method, url = %ctx.url, "HTTP request");
    }

    async fn on_response(&self, ctx: &RequestContext, response: &ResponseInfo) {
        tracing::debug!(
            method = %ctx.method,
            url = %ctx.url,
            status = response.status,
            duration_ms = response.duration_ms,
            "HTTP response"
        );
    }

    async fn on_failure(&self, ctx: &RequestContext, error: &reqwest::Error) {
        tracing::warn!(method = %ctx.method, url = %ctx.url, error = %error, "HTTP request failed");
    }
}
