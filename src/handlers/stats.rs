use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::telemetry::{AltitudeStats, STATS_WINDOW};
use crate::AppState;

use super::MessageResponse;

const NOT_ENOUGH_DATA: &str = "Not enough data for the last 5 minutes";

/// Either the numbers or the "not enough data" message; both are 200s.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatsResponse {
    Stats(AltitudeStats),
    NotEnoughData(MessageResponse),
}

// ─── GET /stats ──────────────────────────────────────────────────

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    state.sample_on_request().await;

    let window = state.store.window(Utc::now(), STATS_WINDOW);

    Json(match AltitudeStats::from_samples(&window) {
        Some(stats) => StatsResponse::Stats(stats),
        None => StatsResponse::NotEnoughData(MessageResponse::new(NOT_ENOUGH_DATA)),
    })
}
