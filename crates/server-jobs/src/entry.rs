// crates/server-jobs/src/entry.rs
//! State for a single job.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use reelwatch_core::LineBuffer;
use reelwatch_server_process_tree::WorkerHandle;
use tokio::sync::watch;

use crate::retention::RetentionTimer;
use crate::types::{JobId, JobState, OwnerId};

/// One job and everything it owns.
///
/// Identity and paths are immutable. Mutable state lives behind a per-entry
/// mutex, which is the lock domain for poll/stop/exit on this job; the line
/// buffer has its own lock so output readers never contend with it.
#[derive(Debug)]
pub struct JobEntry {
    id: JobId,
    owner: OwnerId,
    input_path: PathBuf,
    output_path: PathBuf,
    created_at: DateTime<Utc>,
    pub(crate) lines: LineBuffer,
    inner: Mutex<JobInner>,
    state_tx: watch::Sender<JobState>,
}

#[derive(Debug)]
pub(crate) struct JobInner {
    pub state: JobState,
    pub download_token: Option<String>,
    /// Set by `stop`; wins over the exit code once recorded.
    pub stop_requested: bool,
    /// Set by whichever path claims the terminal transition first.
    pub resolving: bool,
    /// A download stream currently owns the artifact.
    pub downloading: bool,
    pub worker: Option<WorkerHandle>,
    pub retention: Option<RetentionTimer>,
}

impl JobEntry {
    pub fn new(
        id: JobId,
        owner: OwnerId,
        input_path: PathBuf,
        output_path: PathBuf,
        line_cap: usize,
    ) -> Self {
        let (state_tx, _) = watch::channel(JobState::Running);
        Self {
            id,
            owner,
            input_path,
            output_path,
            created_at: Utc::now(),
            lines: LineBuffer::new(line_cap),
            inner: Mutex::new(JobInner {
                state: JobState::Running,
                download_token: None,
                stop_requested: false,
                resolving: false,
                downloading: false,
                worker: None,
                retention: None,
            }),
            state_tx,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn state(&self) -> JobState {
        self.lock().state
    }

    pub fn download_token(&self) -> Option<String> {
        self.lock().download_token.clone()
    }

    /// Resolve once the job reaches a terminal state.
    pub async fn wait_terminal(&self) -> JobState {
        let mut rx = self.state_tx.subscribe();
        let state = match rx.wait_for(|s| s.is_terminal()).await {
            Ok(state) => *state,
            Err(_) => self.state(),
        };
        state
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, JobInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!(job_id = %self.id, "job mutex poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Record a new state and wake waiters. Caller holds the inner lock.
    pub(crate) fn publish(&self, inner: &mut JobInner, state: JobState) {
        inner.state = state;
        self.state_tx.send_replace(state);
    }
}
