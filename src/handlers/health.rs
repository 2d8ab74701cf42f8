use axum::{extract::State, Json};
use chrono::Utc;
use std::sync::Arc;

use crate::telemetry::{HealthStatus, HEALTH_WINDOW};
use crate::AppState;

use super::MessageResponse;

const NOT_ENOUGH_DATA: &str = "Not enough data for the last minute";

// ─── GET /health ─────────────────────────────────────────────────

/// Classifies the mean altitude over the last minute.
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<MessageResponse> {
    state.sample_on_request().await;

    let window = state.store.window(Utc::now(), HEALTH_WINDOW);

    let message = match HealthStatus::classify(&window) {
        Some(status) => status.message(),
        None => NOT_ENOUGH_DATA,
    };
    Json(MessageResponse::new(message))
}
