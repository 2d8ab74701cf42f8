use axum::{middleware as axum_mw, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::middleware::timing;
use crate::AppState;

/// Builds the Axum `Router` with both read endpoints and global middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // ── Read endpoints ──────────────────────────────────────
        .route("/stats", get(handlers::stats::get_stats))
        .route("/health", get(handlers::health::get_health))
        // ── Provide shared state to all routes above ────────────
        .with_state(state)
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn(timing::timing_middleware))
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SamplingMode;
    use crate::handlers::test_support::{ago, offline_state};
    use axum::body::{self, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt; // for `oneshot`

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        assert!(resp.headers().contains_key("X-Response-Time-Us"));
        let bytes = body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn stats_on_empty_store() {
        let app = create_router(offline_state(SamplingMode::OnRequest, &[]));
        let (status, body) = get_json(app, "/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Not enough data for the last 5 minutes"}));
    }

    #[tokio::test]
    async fn stats_over_two_samples() {
        let state = offline_state(
            SamplingMode::Interval(Duration::from_secs(10)),
            &[ago(240, 300.0), ago(120, 320.0)],
        );
        let (status, body) = get_json(create_router(state), "/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"minAltitude": 300.0, "maxAltitude": 320.0, "avgAltitude": 310.0})
        );
    }

    #[tokio::test]
    async fn health_on_empty_store() {
        let app = create_router(offline_state(SamplingMode::OnRequest, &[]));
        let (status, body) = get_json(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Not enough data for the last minute"}));
    }

    #[tokio::test]
    async fn health_at_exactly_160() {
        let state = offline_state(
            SamplingMode::OnRequest,
            &[ago(50, 158.0), ago(30, 160.0), ago(10, 162.0)],
        );
        let (status, body) = get_json(create_router(state), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Sustained Low Earth Orbit Resumed"}));
    }

    #[tokio::test]
    async fn upstream_outage_is_invisible_to_clients() {
        let state = offline_state(SamplingMode::OnRequest, &[ago(30, 420.0)]);
        let app = create_router(state.clone());

        let (status, body) = get_json(app.clone(), "/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"minAltitude": 420.0, "maxAltitude": 420.0, "avgAltitude": 420.0})
        );

        let (status, body) = get_json(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Altitude is A-OK"}));
        assert_eq!(state.store.len(), 1);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let app = create_router(offline_state(SamplingMode::OnRequest, &[]));
        let resp = app
            .oneshot(Request::builder().uri("/history").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
