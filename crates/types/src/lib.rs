// crates/types/src/lib.rs
//! Wire types shared between the reelwatch server and its browser client.
//!
//! Field names are camelCase on the wire. TypeScript bindings are generated
//! with ts-rs when the `codegen` feature is enabled.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Lifecycle state of a job as reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "lowercase")]
pub enum JobOutcome {
    Running,
    Succeeded,
    Failed,
    Stopped,
}

impl JobOutcome {
    /// Whether no further worker activity can occur.
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobOutcome::Running)
    }
}

/// Response body for `POST /api/jobs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub job_id: String,
}

/// Response body for `GET /api/jobs/{id}/status`.
///
/// `lines` holds only the status lines produced since the previous poll.
/// `download_url` is always serialized (as `null` when absent) so clients can
/// rely on the key being present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    pub lines: Vec<String>,
    pub done: bool,
    pub state: JobOutcome,
    pub download_url: Option<String>,
}

/// Response body for `POST /api/jobs/{id}/stop`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
pub struct StopResponse {
    pub success: bool,
}
