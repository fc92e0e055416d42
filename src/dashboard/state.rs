//! Shared dashboard state

use chrono::{DateTime, Utc};

use crate::config::DashboardConfig;

/// Read-only state; artifacts are re-read per request instead of cached here
#[derive(Debug)]
pub struct AppState {
    pub config: DashboardConfig,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config,
            started_at: Utc::now(),
        }
    }
}
