//! Observed HTTP
//!
//! Outbound traffic goes through an [`ObservedClient`], a `reqwest::Client`
//! with an interceptor chain. [`DiagnosticsInterceptor`] turns each call into
//! capture records; [`TracingInterceptor`] logs them.
//!
//! ```rust,no_run
//! use pitchside::capture::DiagnosticsService;
//! use pitchside::http::{DiagnosticsInterceptor, ObservedClient};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), reqwest::Error> {
//! let service = Arc::new(DiagnosticsService::in_memory());
//! let client = ObservedClient::default()
//!     .with(Arc::new(DiagnosticsInterceptor::new(Arc::clone(&service))));
//!
//! let response = client.get("http://localhost:8000/api/predictions").send().await?;
//! println!("{} ({} calls recorded)", response.status(), service.api_calls().len());
//! # Ok(())
//! # }
//! ```

mod client;
mod interceptor;

pub use client::{ObservedClient, ObservedRequest};
pub use interceptor::{
    DiagnosticsInterceptor, Interceptor, RequestContext, ResponseInfo, TracingInterceptor,
};

#[cfg(test)]
pub(crate) mod test_support {
    use axum::Router;

    /// Serve `router` on an ephemeral local port, returning its base URL
    pub(crate) async fn spawn_test_server(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }
}
