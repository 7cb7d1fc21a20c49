use crate::{handlers::AppState, models::HealthStatus};
use axum::{extract::State, Json};
use chrono::Utc;
use std::time::Instant;

#[derive(Clone)]
pub struct HealthState {
    pub app: AppState,
    pub started: Instant,
}

pub async fn health_check(State(state): State<HealthState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        asset_id: state.app.pipeline.config().asset_id.clone(),
        uptime_seconds: state.started.elapsed().as_secs(),
        timestamp: Utc::now(),
    })
}
