use axum::routing::{get, post};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// ```text
/// POST   /generate        -> submit_job
/// GET    /status/{id}     -> get_status
/// GET    /jobs            -> list_jobs
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate", post(jobs::submit_job))
        .route("/status/{id}", get(jobs::get_status))
        .route("/jobs", get(jobs::list_jobs))
}
