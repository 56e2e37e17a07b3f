// crates/server/src/routes/downloads.rs
//! GET /downloads/{token}: stream a finished artifact, once.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::Response;
use axum::routing::get;
use axum::Router;

use crate::auth::Owner;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

async fn download_artifact(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Path(token): Path<String>,
) -> ApiResult<Response> {
    let artifact = state.jobs.download(&token, &owner).await?;

    let disposition = format!("attachment; filename=\"{}\"", artifact.file_name());
    let mut response = Response::builder()
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(header::CONTENT_DISPOSITION, disposition);
    if let Some(len) = artifact.content_length() {
        response = response.header(header::CONTENT_LENGTH, len);
    }

    // Dropping the body (finished or abandoned) removes the file and the job.
    response
        .body(Body::from_stream(artifact.into_stream()))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/downloads/{token}", get(download_artifact))
}
