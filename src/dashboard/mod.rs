//! Dashboard API Integration
//!
//! The analytics dashboard's REST API is the traffic capture observes.
//!
//! - **Client**: typed calls for predictions, lineups, analytics, SHAP and settings
//! - **Poller**: periodic refresh of selected resources

mod client;
mod poller;

pub use client::{DashboardClient, DashboardConfig, DashboardError, Lineup, LineupFilter};
pub use poller::{DashboardPoller, PollConfig, RefreshStatus, Resource, ResourceStatus};
