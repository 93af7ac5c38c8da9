use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::services::HistoryStore;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
    active_sessions: usize,
    max_sessions: usize,
}

pub async fn health_check(
    Extension(history): Extension<Arc<HistoryStore>>,
) -> (StatusCode, Json<HealthResponse>) {
    let stats = history.stats();
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            active_sessions: stats.active_sessions,
            max_sessions: stats.max_sessions,
        }),
    )
}

pub async fn readiness_check() -> StatusCode {
    StatusCode::OK
}
