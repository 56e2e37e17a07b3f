// crates/server-jobs/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by job operations.
///
/// Worker start and runtime failures are not errors here: they become
/// `Failed` jobs observed through polling.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("No file uploaded")]
    MissingUpload,

    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job belongs to another owner: {0}")]
    Forbidden(String),

    #[error("Artifact no longer available: {0}")]
    Gone(String),

    #[error("Storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl JobError {
    /// Whether the caller sent something unacceptable (as opposed to a
    /// lookup or server-side failure).
    pub fn is_client_error(&self) -> bool {
        matches!(self, JobError::UnsupportedMediaType(_) | JobError::MissingUpload)
    }
}

pub type JobResult<T> = Result<T, JobError>;
