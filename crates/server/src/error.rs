// crates/server/src/error.rs
use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use reelwatch_server_jobs::JobError;
use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

/// Structured JSON error response for API errors
#[derive(Debug, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// API error types that map to HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Job(#[from] JobError),

    #[error("Malformed upload: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Missing owner identity")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            ApiError::Job(job_err) => match job_err {
                JobError::UnsupportedMediaType(media_type) => {
                    tracing::warn!(media_type = %media_type, "Rejected upload");
                    (
                        StatusCode::BAD_REQUEST,
                        ErrorResponse::with_details("Unsupported video type", media_type.clone()),
                    )
                }
                JobError::MissingUpload => {
                    tracing::warn!("Upload without a video");
                    (StatusCode::BAD_REQUEST, ErrorResponse::new("No video uploaded"))
                }
                JobError::NotFound(id) => {
                    tracing::debug!(id = %id, "Job not found");
                    (
                        StatusCode::NOT_FOUND,
                        ErrorResponse::with_details("Unknown job id", id.clone()),
                    )
                }
                JobError::Forbidden(id) => {
                    tracing::warn!(job_id = %id, "Owner mismatch");
                    (StatusCode::FORBIDDEN, ErrorResponse::new("Forbidden"))
                }
                JobError::Gone(id) => {
                    tracing::info!(job_id = %id, "Artifact no longer on disk");
                    (
                        StatusCode::GONE,
                        ErrorResponse::with_details("Gone", format!("Job ID: {id}")),
                    )
                }
                JobError::Storage { path, source } => {
                    tracing::error!(path = %path.display(), error = %source, "Storage error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ErrorResponse::new("Failed to start job"),
                    )
                }
            },
            ApiError::Multipart(err) => {
                tracing::warn!(error = %err, "Malformed multipart body");
                (
                    err.status(),
                    ErrorResponse::with_details("Malformed upload", err.body_text()),
                )
            }
            ApiError::Unauthorized => {
                tracing::warn!("Request without owner identity");
                (StatusCode::UNAUTHORIZED, ErrorResponse::new("Unauthorized"))
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!(message = %msg, "Bad request");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details("Bad request", msg.clone()),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!(message = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_details("Internal server error", msg.clone()),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
