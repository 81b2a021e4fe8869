use axum::routing::get;
use axum::Router;

use crate::handlers::outputs;
use crate::state::AppState;

/// ```text
/// GET    /output/{filename}   -> download_output
/// GET    /outputs             -> list_outputs
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/output/{filename}", get(outputs::download_output))
        .route("/outputs", get(outputs::list_outputs))
}
