//! Dashboard Poller
//!
//! Periodically refreshes dashboard resources the way open dashboard pages
//! do, so their traffic keeps flowing through capture.

use super::{DashboardClient, DashboardError, LineupFilter};
use crate::capture::{spawn_observed, DiagnosticsService};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A dashboard resource that can be refreshed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Predictions,
    Lineup,
    Analytics,
    Shap,
    Settings,
}

impl Resource {
    pub fn all() -> &'static [Resource] {
        &[
            Resource::Predictions,
            Resource::Lineup,
            Resource::Analytics,
            Resource::Shap,
            Resource::Settings,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Predictions => "predictions",
            Resource::Lineup => "lineup",
            Resource::Analytics => "analytics",
            Resource::Shap => "shap",
            Resource::Settings => "settings",
        }
    }
}

impl std::str::FromStr for Resource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::all()
            .iter()
            .copied()
            .find(|r| r.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| format!("unknown dashboard resource: {}", s))
    }
}

/// Outcome of the last refresh of a resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum RefreshStatus {
    Success,
    Failed { error: String },
}

/// Per-resource refresh bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceStatus {
    pub resource: Resource,
    pub last_refresh: Option<DateTime<Utc>>,
    pub last_status: Option<RefreshStatus>,
    pub error_count: u32,
}

/// Poller settings
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub resources: Vec<Resource>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60,
            resources: Resource::all().to_vec(),
        }
    }
}

/// Refreshes configured resources on an interval
pub struct DashboardPoller {
    client: Arc<DashboardClient>,
    config: PollConfig,
    service: Option<Arc<DiagnosticsService>>,
    status: RwLock<HashMap<Resource, ResourceStatus>>,
    running: RwLock<bool>,
}

impl DashboardPoller {
    pub fn new(client: Arc<DashboardClient>, config: PollConfig) -> Self {
        Self {
            client,
            config,
            service: None,
            status: RwLock::new(HashMap::new()),
            running: RwLock::new(false),
        }
    }

    /// Builder method: record failed background refreshes as unhandled rejections
    pub fn observed_by(mut self, service: Arc<DiagnosticsService>) -> Self {
        self.service = Some(service);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled && !self.config.resources.is_empty()
    }

    /// Refresh one resource, discarding the payload
    pub async fn refresh(&self, resource: Resource) -> Result<(), DashboardError> {
        let result = match resource {
            Resource::Predictions => self.client.predictions().await.map(|_| ()),
            Resource::Lineup => self.client.lineup(&LineupFilter::default()).await.map(|_| ()),
            Resource::Analytics => self.client.analytics().await.map(|_| ()),
            Resource::Shap => self.client.shap().await.map(|_| ()),
            Resource::Settings => self.client.settings().await.map(|_| ()),
        };

        let mut status = self.status.write().await;
        let entry = status.entry(resource).or_insert_with(|| ResourceStatus {
            resource,
            last_refresh: None,
            last_status: None,
            error_count: 0,
        });
        entry.last_refresh = Some(Utc::now());
        match &result {
            Ok(()) => {
                entry.last_status = Some(RefreshStatus::Success);
                entry.error_count = 0;
            }
            Err(e) => {
                entry.last_status = Some(RefreshStatus::Failed {
                    error: e.to_string(),
                });
                entry.error_count += 1;
            }
        }

        result
    }

    /// Refresh one resource on a detached task
    ///
    /// Nobody awaits the result; with a service attached, a failure is
    /// recorded as an unhandled rejection named after the resource.
    pub fn spawn_refresh(self: &Arc<Self>, resource: Resource) -> tokio::task::JoinHandle<()> {
        let poller = Arc::clone(self);
        let task = async move { poller.refresh(resource).await };

        match &self.service {
            Some(service) => spawn_observed(
                Arc::clone(service),
                format!("{} refresh", resource.as_str()),
                task,
            ),
            None => tokio::spawn(async move {
                if let Err(e) = task.await {
                    tracing::warn!(resource = resource.as_str(), error = %e, "Dashboard refresh failed");
                }
            }),
        }
    }

    /// Refresh every configured resource concurrently; returns the number that failed
    pub async fn poll_once(self: &Arc<Self>) -> usize {
        let handles: Vec<_> = self
            .config
            .resources
            .iter()
            .map(|resource| self.spawn_refresh(*resource))
            .collect();

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Dashboard refresh task aborted");
            }
        }

        let status = self.status.read().await;
        self.config
            .resources
            .iter()
            .filter(|r| {
                matches!(
                    status.get(*r).and_then(|s| s.last_status.as_ref()),
                    Some(RefreshStatus::Failed { .. })
                )
            })
            .count()
    }

    /// Status of every resource refreshed so far
    pub async fn get_status(&self) -> Vec<ResourceStatus> {
        let status = self.status.read().await;
        self.config
            .resources
            .iter()
            .filter_map(|r| status.get(r).cloned())
            .collect()
    }

    /// Start the background polling task
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let poller = self.clone();

        tokio::spawn(async move {
            *poller.running.write().await = true;

            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(poller.config.interval_secs.max(1)));

            loop {
                interval.tick().await;

                if !*poller.running.read().await {
                    break;
                }

                let failed = poller.poll_once().await;
                tracing::debug!(
                    resources = poller.config.resources.len(),
                    failed,
                    "Dashboard poll completed"
                );
            }
        })
    }

    /// Stop the poller after its current round
    pub async fn stop(&self) {
        *self.running.write().await = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{DiagnosticsService, EventKind};
    use crate::dashboard::DashboardConfig;
    use crate::http::test_support::spawn_test_server;
    use axum::{http::StatusCode, routing::get, Json, Router};
    use serde_json::json;

    #[test]
    fn test_resource_parsing() {
        assert_eq!("SHAP".parse::<Resource>().unwrap(), Resource::Shap);
        assert_eq!(" lineup ".parse::<Resource>().unwrap(), Resource::Lineup);
        assert!("scores".parse::<Resource>().is_err());
    }

    #[tokio::test]
    async fn test_poll_once_tracks_status() {
        let router = Router::new()
            .route("/api/predictions", get(|| async { Json(json!([])) }))
            .route("/api/shap", get(|| async { StatusCode::BAD_GATEWAY }));
        let base = spawn_test_server(router).await;

        let service = Arc::new(DiagnosticsService::in_memory());
        let config = DashboardConfig {
            base_url: format!("{}/api", base),
            ..Default::default()
        };
        let client = Arc::new(DashboardClient::new(config, Some(Arc::clone(&service))).unwrap());
        let poller = Arc::new(DashboardPoller::new(
            client,
            PollConfig {
                resources: vec![Resource::Predictions, Resource::Shap],
                ..Default::default()
            },
        ));

        assert_eq!(poller.poll_once().await, 1);

        let status = poller.get_status().await;
        assert_eq!(status.len(), 2);
        assert_eq!(status[0].last_status, Some(RefreshStatus::Success));
        assert_eq!(status[1].error_count, 1);

        assert_eq!(service.api_calls().len(), 2);
        assert_eq!(
            service
                .errors()
                .iter()
                .filter(|e| e.kind == EventKind::ApiError)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_failed_background_refresh_is_unhandled_rejection() {
        let router = Router::new()
            .route("/api/analytics", get(|| async { Json(json!({"roi": 0.04})) }))
            .route("/api/shap", get(|| async { StatusCode::BAD_GATEWAY }));
        let base = spawn_test_server(router).await;

        let service = Arc::new(DiagnosticsService::in_memory());
        let config = DashboardConfig {
            base_url: format!("{}/api", base),
            ..Default::default()
        };
        let client = Arc::new(DashboardClient::new(config, Some(Arc::clone(&service))).unwrap());
        let poller = Arc::new(
            DashboardPoller::new(
                client,
                PollConfig {
                    resources: vec![Resource::Analytics, Resource::Shap],
                    ..Default::default()
                },
            )
            .observed_by(Arc::clone(&service)),
        );

        assert_eq!(poller.poll_once().await, 1);

        let rejections: Vec<_> = service
            .errors()
            .into_iter()
            .filter(|e| e.kind == EventKind::UnhandledRejection)
            .collect();
        assert_eq!(rejections.len(), 1);
        assert!(rejections[0].message.starts_with("shap refresh: "));
    }
}
