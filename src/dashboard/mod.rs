//! Monitoring dashboard
//!
//! Server-rendered HTML over axum:
//! - `GET /` prediction tables, metrics and charts for both models
//! - `POST /predict` the same page with a live single-shot prediction
//! - `GET /api/health` JSON status

mod api;
pub mod charts;
mod handlers;
pub mod sections;
mod state;

pub use api::create_router;
pub use state::AppState;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::DashboardConfig;

/// Serve the dashboard until ctrl+c
pub async fn run_dashboard(config: DashboardConfig) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();
    for path in [config.classification_predictions(), config.regression_predictions()] {
        if !path.is_file() {
            warn!(path = %path.display(), "Prediction table not found yet, its section will show an error");
        }
    }

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let state = Arc::new(AppState::new(config.clone()));
    let app = create_router(state);

    info!(
        address = %addr,
        processed_dir = %config.processed_dir.display(),
        models_dir = %config.models_dir.display(),
        started_at = %start_time.to_rfc3339(),
        "Dashboard starting"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(url = %format!("http://{}", addr), pid = std::process::id(), "Dashboard listening");

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for ctrl+c");
            std::future::pending::<()>().await;
        }
        let uptime = chrono::Utc::now().signed_duration_since(start_time);
        info!(uptime_secs = uptime.num_seconds(), "Shutdown signal received, stopping dashboard");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Dashboard shut down cleanly");
    Ok(())
}
