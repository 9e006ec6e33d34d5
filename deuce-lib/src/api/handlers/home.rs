//! `/v1.0/`, `/v1.0/ping`, `/v1.0/health` (spec §6).

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::services::Services;

pub async fn home() -> impl IntoResponse {
    Json(json!({
        "name": "deuce",
        "version": env!("CARGO_PKG_VERSION"),
        "v1.0": { "href": "/v1.0/" },
    }))
}

pub async fn ping() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub async fn health(State(services): State<Services>) -> impl IntoResponse {
    Json(services.health.check().await)
}
