//! HTTP handlers

use std::sync::Arc;

use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    Json,
};
use serde_json::json;
use tracing::{error, info, warn};

use super::sections::{live_model_path, predict_shot, render_dashboard, render_section, ShotForm};
use super::state::AppState;

async fn render(state: Arc<AppState>, form: ShotForm, predict: bool) -> (StatusCode, Html<String>) {
    let rendered = tokio::task::spawn_blocking(move || {
        let config = &state.config;
        let prediction = predict.then(|| predict_shot(&live_model_path(&config.models_dir), &form));
        match &prediction {
            Some(Ok(p)) => info!(made = p.made, probability = p.probability, "Live prediction"),
            Some(Err(e)) => warn!(error = %e, "Live prediction failed"),
            None => {}
        }
        render_dashboard(config, &form, prediction.as_ref())
    })
    .await;

    match rendered {
        Ok(html) => (StatusCode::OK, Html(html)),
        Err(e) => {
            error!(error = %e, "Dashboard render task failed");
            let card = render_section("Dashboard", Err(crate::error::PipelineError::Data(e.to_string())));
            (StatusCode::INTERNAL_SERVER_ERROR, Html(card))
        }
    }
}

/// GET /
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    render(state, ShotForm::default(), false).await
}

/// POST /predict
pub async fn predict(State(state): State<Arc<AppState>>, Form(form): Form<ShotForm>) -> impl IntoResponse {
    render(state, form, true).await
}

/// GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let config = &state.config;
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": (chrono::Utc::now() - state.started_at).num_seconds(),
        "artifacts": {
            "predicoes_clf": config.classification_predictions().is_file(),
            "predicoes_reg": config.regression_predictions().is_file(),
            "live_model": live_model_path(&config.models_dir).is_file(),
        },
    }))
}
