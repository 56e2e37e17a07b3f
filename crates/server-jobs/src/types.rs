// crates/server-jobs/src/types.rs
//! Types for the job system.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::Serialize;
use uuid::Uuid;

/// Unique identifier for a job, handed to the submitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Identity of the principal that submitted a job.
///
/// Verified upstream; the job system only compares it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status of a job.
///
/// `Running` is the only non-terminal state; terminal states never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Running,
    Succeeded,
    Failed,
    Stopped,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobState::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Running => "running",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
            JobState::Stopped => "stopped",
        }
    }
}

/// An uploaded input file.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl Upload {
    /// Lowercased extension including the dot, or empty.
    pub fn extension(&self) -> String {
        std::path::Path::new(&self.file_name)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_ascii_lowercase()))
            .unwrap_or_default()
    }

    /// Media type without parameters, lowercased.
    pub fn media_type(&self) -> Option<String> {
        self.content_type
            .as_deref()
            .map(|ct| ct.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
            .filter(|ct| !ct.is_empty())
    }
}

/// Result of one poll: lines produced since the last poll plus terminal info.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub job_id: JobId,
    pub state: JobState,
    pub done: bool,
    pub lines: Vec<String>,
    /// Present only for a finished job whose artifact is still downloadable.
    pub download_token: Option<String>,
}

/// How a worker run ended, as reported to the transition function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerExit {
    /// No interpreter/executable was available, nothing was launched.
    Unavailable,
    /// The launch itself failed (not found, permission denied, ...).
    SpawnFailed(String),
    /// The process ran and exited. `None` when killed by a signal.
    Exited { code: Option<i32> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn upload(name: &str, ct: Option<&str>) -> Upload {
        Upload {
            file_name: name.to_string(),
            content_type: ct.map(str::to_string),
            bytes: Bytes::from_static(b"x"),
        }
    }

    #[test]
    fn test_job_id_roundtrip_through_display() {
        let id = JobId::new();
        let parsed: JobId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<JobId>().is_err());
    }

    #[test]
    fn test_job_state_terminality() {
        assert!(!JobState::Running.is_terminal());
        assert!(JobState::Succeeded.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Stopped.is_terminal());
        assert_eq!(JobState::Stopped.as_str(), "stopped");
    }

    #[test]
    fn test_upload_extension() {
        assert_eq!(upload("Clip.MOV", None).extension(), ".mov");
        assert_eq!(upload("archive.tar.MP4", None).extension(), ".mp4");
        assert_eq!(upload("noext", None).extension(), "");
    }

    #[test]
    fn test_upload_media_type_strips_params() {
        assert_eq!(
            upload("a.mp4", Some("Video/MP4; codecs=avc1")).media_type(),
            Some("video/mp4".to_string())
        );
        assert_eq!(upload("a.mp4", Some("  ")).media_type(), None);
        assert_eq!(upload("a.mp4", None).media_type(), None);
    }

    #[test]
    fn test_snapshot_serialize() {
        let snap = JobSnapshot {
            job_id: JobId::new(),
            state: JobState::Succeeded,
            done: true,
            lines: vec!["[done] saved=x_out.mp4".to_string()],
            download_token: Some("tok".to_string()),
        };
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["state"], "succeeded");
        assert_eq!(json["download_token"], "tok");
    }
}
