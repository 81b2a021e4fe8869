//! Handlers for finished artifacts.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Json;
use scenegen_pipeline::ArtifactInfo;
use tokio_util::io::ReaderStream;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// GET /output/{filename}
///
/// Streams the artifact as a download. Unknown, malformed and not yet
/// finished names are all 404.
pub async fn download_output(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> AppResult<Response> {
    let artifact = state.store.open(&filename).await?;
    tracing::debug!(artifact = %artifact.name, size = artifact.size, "Serving artifact");

    let stream = ReaderStream::new(artifact.file);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, artifact.format.content_type())
        .header(header::CONTENT_LENGTH, artifact.size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", artifact.name),
        )
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::InternalError(e.to_string()))
}

/// GET /outputs
pub async fn list_outputs(State(state): State<AppState>) -> AppResult<Json<Vec<ArtifactInfo>>> {
    let artifacts = state.store.list().await?;
    Ok(Json(artifacts))
}
