use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::engine::StatusCounts;
use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Jobs known to this process, by status.
    pub jobs: StatusCounts,
}

/// GET /health -- returns service status and job counts.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        jobs: state.registry.counts().await,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
