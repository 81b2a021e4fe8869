pub mod health;
pub mod jobs;
pub mod outputs;

use axum::Router;

use crate::state::AppState;

/// Build the API route tree.
///
/// Route hierarchy:
///
/// ```text
/// /generate                 submit a job (POST)
/// /status/{id}              one job record
/// /jobs                     every job record
///
/// /output/{filename}        download an artifact
/// /outputs                  list artifacts
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(jobs::router())
        .merge(outputs::router())
}
