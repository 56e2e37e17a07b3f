// crates/server/src/routes/jobs.rs
//! Job endpoints.
//!
//! - POST /jobs: upload a video (multipart field `video`) and start a job
//! - GET /jobs/{id}/status: drain new output lines
//! - POST /jobs/{id}/stop: terminate a running job

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use reelwatch_server_jobs::{JobError, JobId, JobState, Upload};
use reelwatch_types::{JobOutcome, JobStatusResponse, StopResponse, SubmitResponse};

use crate::auth::Owner;
use crate::error::ApiResult;
use crate::state::AppState;

/// Multipart field holding the upload.
pub const UPLOAD_FIELD: &str = "video";

/// POST /api/jobs: accept an upload and start processing it.
async fn submit_job(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    mut multipart: Multipart,
) -> ApiResult<Json<SubmitResponse>> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        upload = Some(Upload {
            file_name,
            content_type,
            bytes,
        });
        break;
    }

    let upload = upload.ok_or(JobError::MissingUpload)?;
    let job_id = state.jobs.submit(owner, upload).await?;
    Ok(Json(SubmitResponse {
        job_id: job_id.to_string(),
    }))
}

/// GET /api/jobs/{id}/status: lines since the last poll plus terminal info.
async fn job_status(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> ApiResult<Json<JobStatusResponse>> {
    let job_id = parse_job_id(&id)?;
    let snapshot = state.jobs.poll(&job_id, &owner)?;
    Ok(Json(JobStatusResponse {
        lines: snapshot.lines,
        done: snapshot.done,
        state: outcome(snapshot.state),
        download_url: snapshot.download_token.map(|token| download_url(&token)),
    }))
}

/// POST /api/jobs/{id}/stop: returns once the job is terminal.
async fn stop_job(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> ApiResult<Json<StopResponse>> {
    let job_id = parse_job_id(&id)?;
    state.jobs.stop(&job_id, &owner).await?;
    Ok(Json(StopResponse { success: true }))
}

/// Ids that are not even well-formed cannot name a job.
fn parse_job_id(id: &str) -> Result<JobId, JobError> {
    id.parse().map_err(|_| JobError::NotFound(id.to_string()))
}

fn outcome(state: JobState) -> JobOutcome {
    match state {
        JobState::Running => JobOutcome::Running,
        JobState::Succeeded => JobOutcome::Succeeded,
        JobState::Failed => JobOutcome::Failed,
        JobState::Stopped => JobOutcome::Stopped,
    }
}

pub fn download_url(token: &str) -> String {
    format!("/api/downloads/{token}")
}

/// Build the jobs router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/jobs", post(submit_job))
        .route("/jobs/{id}/status", get(job_status))
        .route("/jobs/{id}/stop", post(stop_job))
}
