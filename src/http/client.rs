//! Observed HTTP client
//!
//! Wraps `reqwest::Client` with an interceptor chain. Responses and errors
//! are returned exactly as reqwest produced them; interceptors run in
//! registration order around every call.

use crate::http::interceptor::{Interceptor, RequestContext, ResponseInfo};
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Client, Method, Request, RequestBuilder, Response};
use serde::Serialize;
use std::sync::Arc;

/// `reqwest::Client` plus an interceptor chain
#[derive(Clone)]
pub struct ObservedClient {
    inner: Client,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl ObservedClient {
    pub fn new(inner: Client) -> Self {
        Self {
            inner,
            interceptors: Vec::new(),
        }
    }

    /// Builder method: append an interceptor to the chain
    pub fn with(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn interceptor_names(&self) -> Vec<&str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    pub fn inner(&self) -> &Client {
        &self.inner
    }

    pub fn request(&self, method: Method, url: &str) -> ObservedRequest {
        ObservedRequest {
            client: self.clone(),
            method: method.clone(),
            url: url.to_string(),
            builder: self.inner.request(method, url),
        }
    }

    pub fn get(&self, url: &str) -> ObservedRequest {
        self.request(Method::GET, url)
    }

    pub fn post(&self, url: &str) -> ObservedRequest {
        self.request(Method::POST, url)
    }

    pub fn put(&self, url: &str) -> ObservedRequest {
        self.request(Method::PUT, url)
    }

    pub fn delete(&self, url: &str) -> ObservedRequest {
        self.request(Method::DELETE, url)
    }

    /// Send a prepared request through the chain
    pub async fn execute(&self, request: Request) -> Result<Response, reqwest::Error> {
        let ctx = RequestContext::new(request.method().as_str(), request.url().as_str());

        for interceptor in &self.interceptors {
            interceptor.on_request(&ctx).await;
        }

        match self.inner.execute(request).await {
            Ok(response) => {
                let info = ResponseInfo::from_status(response.status(), ctx.elapsed_ms());
                for interceptor in &self.interceptors {
                    interceptor.on_response(&ctx, &info).await;
                }
                Ok(response)
            }
            Err(e) => {
                self.notify_failure(&ctx, &e).await;
                Err(e)
            }
        }
    }

    async fn notify_failure(&self, ctx: &RequestContext, error: &reqwest::Error) {
        for interceptor in &self.interceptors {
            interceptor.on_failure(ctx, error).await;
        }
    }
}

impl Default for ObservedClient {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

/// Request under construction; `send` routes it through the chain
pub struct ObservedRequest {
    client: ObservedClient,
    method: Method,
    url: String,
    builder: RequestBuilder,
}

impl ObservedRequest {
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        self.builder = self.builder.json(body);
        self
    }

    pub fn query<T: Serialize + ?Sized>(mut self, query: &T) -> Self {
        self.builder = self.builder.query(query);
        self
    }

    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.builder = self.builder.timeout(timeout);
        self
    }

    /// Build and send
    ///
    /// A request that cannot be built (bad URL, unserializable body) counts
    /// as a failed call, like a fetch that rejects before reaching the network.
    pub async fn send(self) -> Result<Response, reqwest::Error> {
        match self.builder.build() {
            Ok(request) => self.client.execute(request).await,
            Err(e) => {
                let ctx = RequestContext::new(self.method.as_str(), self.url);
                self.client.notify_failure(&ctx, &e).await;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{DiagnosticsService, EventKind};
    use crate::http::test_support::spawn_test_server;
    use crate::http::DiagnosticsInterceptor;
    use axum::{http::StatusCode, routing::get, Router};

    fn observed(service: &Arc<DiagnosticsService>) -> ObservedClient {
        ObservedClient::default().with(Arc::new(DiagnosticsInterceptor::new(Arc::clone(service))))
    }

    fn test_router() -> Router {
        Router::new()
            .route("/ok", get(|| async { "fine" }))
            .route(
                "/boom",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "nope") }),
            )
    }

    #[tokio::test]
    async fn test_success_records_call_without_error() {
        let base = spawn_test_server(test_router()).await;
        let service = Arc::new(DiagnosticsService::in_memory());

        let response = observed(&service).get(&format!("{}/ok", base)).send().await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), "fine");

        let calls = service.api_calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].ok);
        assert_eq!(calls[0].method, "GET");
        assert_eq!(calls[0].status_text, "OK");
        assert!(service
            .errors()
            .iter()
            .all(|e| e.kind != EventKind::ApiError));
    }

    #[tokio::test]
    async fn test_server_error_records_call_and_api_error() {
        let base = spawn_test_server(test_router()).await;
        let service = Arc::new(DiagnosticsService::in_memory());

        let response = observed(&service)
            .get(&format!("{}/boom", base))
            .send()
            .await
            .unwrap();
        // The failure status is handed back untouched
        assert_eq!(response.status(), 500);
        assert_eq!(response.text().await.unwrap(), "nope");

        let calls = service.api_calls();
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].ok);
        assert_eq!(calls[0].status, 500);

        let api_errors: Vec<_> = service
            .errors()
            .into_iter()
            .filter(|e| e.kind == EventKind::ApiError)
            .collect();
        assert_eq!(api_errors.len(), 1);
        assert_eq!(api_errors[0].status, Some(500));
    }

    #[tokio::test]
    async fn test_transport_failure_records_fetch_error_and_returns_error() {
        // Grab a free port, then close it so the connection is refused
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let service = Arc::new(DiagnosticsService::in_memory());
        let url = format!("http://{}/predictions", addr);

        let err = observed(&service).get(&url).send().await.unwrap_err();
        assert!(err.is_connect());

        let errors = service.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, EventKind::FetchError);
        assert_eq!(errors[0].url.as_deref(), Some(url.as_str()));
        assert!(service.api_calls().is_empty());
    }

    #[tokio::test]
    async fn test_unbuildable_request_counts_as_fetch_error() {
        let service = Arc::new(DiagnosticsService::in_memory());

        let result = observed(&service).get("not a url").send().await;
        assert!(result.is_err());

        let errors = service.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, EventKind::FetchError);
        assert_eq!(errors[0].url.as_deref(), Some("not a url"));
    }

    #[test]
    fn test_interceptor_order() {
        let service = Arc::new(DiagnosticsService::in_memory());
        let client = ObservedClient::default()
            .with(Arc::new(crate::http::TracingInterceptor))
            .with(Arc::new(DiagnosticsInterceptor::new(service)));
        assert_eq!(client.interceptor_names(), vec!["tracing", "diagnostics"]);
    }
}
