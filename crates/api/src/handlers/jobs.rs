//! Handlers for job submission and status polling.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use scenegen_core::error::CoreError;
use scenegen_core::job::JobRecord;
use scenegen_core::submission::GenerateRequest;
use scenegen_core::types::JobId;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job_id: JobId,
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /generate
///
/// Validate the request and enqueue a job. Returns 200 with `{job_id}` as
/// soon as the job is registered; generation continues in the background.
pub async fn submit_job(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> AppResult<Json<SubmitResponse>> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let job_id = state.dispatcher.submit(&request).await?;
    Ok(Json(SubmitResponse { job_id }))
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// GET /status/{id}
///
/// Ids that are not even well-formed are reported as unknown.
pub async fn get_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<JobRecord>> {
    let job_id = JobId::parse(&id).ok_or(AppError::Core(CoreError::NotFound {
        entity: "Job",
        id,
    }))?;
    let record = state.registry.get(&job_id).await?;
    Ok(Json(record))
}

/// GET /jobs
pub async fn list_jobs(State(state): State<AppState>) -> Json<Vec<JobRecord>> {
    Json(state.registry.list_all().await)
}
