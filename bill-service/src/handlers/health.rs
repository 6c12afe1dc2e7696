use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::services::get_metrics;
use crate::startup::HealthState;

/// Liveness probe. Reports the store as well so a dead database is visible.
pub async fn health_check(State(state): State<HealthState>) -> impl IntoResponse {
    match state.bills.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "service": "bill-service",
                "version": env!("CARGO_PKG_VERSION"),
                "storage": state.backend,
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unhealthy",
                "service": "bill-service",
                "error": e.to_string()
            })),
        ),
    }
}

/// Readiness probe.
pub async fn readiness_check(State(state): State<HealthState>) -> impl IntoResponse {
    match state.bills.health_check().await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        get_metrics(),
    )
}
