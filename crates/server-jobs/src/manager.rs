// crates/server-jobs/src/manager.rs
//! Job lifecycle: submit, poll, stop, download.
//!
//! Every terminal transition goes through [`JobManager::finish`] or the stop
//! path, and both claim the entry's `resolving` flag under its lock first. The
//! claimant decides the outcome; a stop recorded before the claim always wins.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use reelwatch_core::MarkerFilter;
use reelwatch_server_process_tree::Terminate;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::config::{JobConfig, WorkerCommand};
use crate::download::{ArtifactDownload, DownloadGuard};
use crate::entry::{JobEntry, JobInner};
use crate::error::{JobError, JobResult};
use crate::fsutil::{exists, remove_file_best_effort};
use crate::registry::JobRegistry;
use crate::retention;
use crate::supervisor;
use crate::types::{JobId, JobSnapshot, JobState, OwnerId, Upload, WorkerExit};

pub const NO_INTERPRETER_LINE: &str = "[error] could not locate a worker interpreter on this system";
pub const STOPPED_LINE: &str = "[stopped] job terminated by user";

/// Suffix appended to the job id for the output artifact.
const OUTPUT_SUFFIX: &str = "_out.mp4";

pub struct JobManager {
    registry: Arc<JobRegistry>,
    config: JobConfig,
    /// `None` when no interpreter could be resolved at startup.
    worker: Option<WorkerCommand>,
    terminator: Arc<dyn Terminate>,
    filter: MarkerFilter,
}

impl std::fmt::Debug for JobManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobManager")
            .field("config", &self.config)
            .field("worker", &self.worker)
            .field("jobs", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl JobManager {
    pub fn new(
        config: JobConfig,
        worker: Option<WorkerCommand>,
        terminator: Arc<dyn Terminate>,
    ) -> Arc<Self> {
        let filter = MarkerFilter::new(config.stderr_noise.iter().cloned());
        Arc::new(Self {
            registry: Arc::new(JobRegistry::new()),
            config,
            worker,
            terminator,
            filter,
        })
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    pub fn worker(&self) -> Option<&WorkerCommand> {
        self.worker.as_ref()
    }

    /// Jobs whose worker has not finished yet.
    pub fn active_jobs(&self) -> usize {
        self.registry.running()
    }

    /// Accept an upload and start processing it.
    ///
    /// Rejections happen before anything touches disk. Worker start failures
    /// still return `Ok`: the job exists and is already `Failed`.
    pub async fn submit(self: &Arc<Self>, owner: OwnerId, upload: Upload) -> JobResult<JobId> {
        let media_type = upload.media_type().ok_or(JobError::MissingUpload)?;
        if !self.config.accepts(&media_type) {
            return Err(JobError::UnsupportedMediaType(media_type));
        }

        let job_id = JobId::new();
        let (input_path, output_path) =
            job_paths(&self.config.work_dir, &job_id, &upload.extension());

        tokio::fs::write(&input_path, &upload.bytes)
            .await
            .map_err(|source| JobError::Storage {
                path: input_path.clone(),
                source,
            })?;

        let entry = Arc::new(JobEntry::new(
            job_id,
            owner,
            input_path,
            output_path,
            self.config.line_cap,
        ));
        metrics::counter!("jobs_submitted_total").increment(1);
        tracing::info!(
            job_id = %job_id,
            owner = %entry.owner(),
            media_type = %media_type,
            bytes = upload.bytes.len(),
            "job submitted"
        );

        let Some(worker) = self.worker.as_ref() else {
            self.registry.insert(Arc::clone(&entry));
            self.finish(&entry, WorkerExit::Unavailable).await;
            return Ok(job_id);
        };

        entry
            .lines
            .push(format!("[info] using worker: {}", worker.program.display()));
        entry.lines.push(format!(
            "[start] input={} output={}",
            file_name(entry.input_path()),
            file_name(entry.output_path()),
        ));

        match supervisor::launch(worker, &entry, &self.filter, self.config.stream_drain_timeout) {
            Ok(running) => {
                entry.lock().worker = Some(running.handle);
                self.registry.insert(Arc::clone(&entry));
                let manager = Arc::clone(self);
                tokio::spawn(async move {
                    let exit = running.exit.await.unwrap_or(WorkerExit::Exited { code: None });
                    manager.finish(&entry, exit).await;
                });
            }
            Err(e) => {
                tracing::warn!(job_id = %job_id, error = %e, "failed to start worker");
                self.registry.insert(Arc::clone(&entry));
                self.finish(&entry, WorkerExit::SpawnFailed(e.to_string()))
                    .await;
            }
        }
        Ok(job_id)
    }

    /// Drain new lines and report status.
    pub fn poll(&self, job_id: &JobId, owner: &OwnerId) -> JobResult<JobSnapshot> {
        let entry = self.owned(job_id, owner)?;
        // State first: lines drained after a terminal state include every
        // line pushed before it.
        let (state, token) = {
            let inner = entry.lock();
            (inner.state, inner.download_token.clone())
        };
        Ok(JobSnapshot {
            job_id: *job_id,
            state,
            done: state.is_terminal(),
            lines: entry.lines.drain(),
            download_token: token.filter(|_| state.is_terminal()),
        })
    }

    /// Stop a running job. Returns once the job is terminal.
    pub async fn stop(&self, job_id: &JobId, owner: &OwnerId) -> JobResult<()> {
        let entry = self.owned(job_id, owner)?;

        let worker = {
            let mut inner = entry.lock();
            if inner.state.is_terminal() {
                return Ok(());
            }
            inner.stop_requested = true;
            inner.worker.clone()
        };
        tracing::info!(job_id = %job_id, "stop requested");

        if let Some(handle) = worker {
            self.terminator.terminate(&handle).await;
        }

        if self.claim(&entry) {
            remove_file_best_effort(entry.input_path()).await;
            remove_file_best_effort(entry.output_path()).await;
            self.settle(&entry, JobState::Stopped, Vec::new());
        }
        // Otherwise the exit path claimed first and decides the outcome.
        entry.wait_terminal().await;
        Ok(())
    }

    /// Hand out the artifact for `token`. Single use.
    pub async fn download(&self, token: &str, owner: &OwnerId) -> JobResult<ArtifactDownload> {
        let entry = self
            .registry
            .find_by_token(token)
            .ok_or_else(|| JobError::NotFound(token.to_string()))?;
        if entry.owner() != owner {
            return Err(JobError::Forbidden(entry.id().to_string()));
        }

        if !exists(entry.output_path()).await {
            self.forget(&entry);
            return Err(JobError::Gone(entry.id().to_string()));
        }

        {
            let mut inner = entry.lock();
            if inner.download_token.as_deref() != Some(token) {
                // Lost a race with another download or with expiry.
                return Err(JobError::NotFound(token.to_string()));
            }
            inner.download_token = None;
            inner.downloading = true;
            if let Some(timer) = inner.retention.take() {
                timer.cancel();
            }
        }

        let output = entry.output_path().to_path_buf();
        let guard = DownloadGuard::new(Arc::clone(&self.registry), entry.id(), output.clone());
        let file = match tokio::fs::File::open(&output).await {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!(job_id = %entry.id(), error = %e, "artifact vanished before open");
                drop(guard);
                return Err(JobError::Gone(entry.id().to_string()));
            }
        };
        let len = file.metadata().await.ok().map(|m| m.len());

        metrics::counter!("downloads_total").increment(1);
        tracing::info!(job_id = %entry.id(), bytes = ?len, "download started");
        Ok(ArtifactDownload::new(file, file_name(&output), len, guard))
    }

    /// Kill every running worker and delete every job file.
    pub async fn shutdown(&self) {
        let entries = self.registry.drain();
        if entries.is_empty() {
            return;
        }
        tracing::info!(jobs = entries.len(), "shutting down job manager");

        let mut tasks = JoinSet::new();
        for entry in entries {
            let terminator = Arc::clone(&self.terminator);
            tasks.spawn(async move {
                let worker = {
                    let mut inner = entry.lock();
                    inner.stop_requested = true;
                    if let Some(timer) = inner.retention.take() {
                        timer.cancel();
                    }
                    inner.worker.clone()
                };
                if let Some(handle) = worker {
                    terminator.terminate(&handle).await;
                }
                remove_file_best_effort(entry.input_path()).await;
                remove_file_best_effort(entry.output_path()).await;
            });
        }
        while tasks.join_next().await.is_some() {}
    }

    /// Terminal transition for a worker that ended (or never started).
    async fn finish(&self, entry: &Arc<JobEntry>, exit: WorkerExit) {
        remove_file_best_effort(entry.input_path()).await;
        let output_exists = exists(entry.output_path()).await;

        let stop_requested = {
            let mut inner = entry.lock();
            if inner.resolving || inner.state.is_terminal() {
                return;
            }
            inner.resolving = true;
            inner.stop_requested
        };

        let (state, lines) = match (&exit, stop_requested) {
            (_, true) => (JobState::Stopped, Vec::new()),
            (WorkerExit::Exited { code: Some(0) }, false) if output_exists => (
                JobState::Succeeded,
                vec![
                    format!("[done] saved={}", file_name(entry.output_path())),
                    "[info] process exited with code 0".to_string(),
                ],
            ),
            (WorkerExit::Exited { code }, false) => {
                let code = code.map_or_else(|| "null".to_string(), |c| c.to_string());
                (
                    JobState::Failed,
                    vec![format!("[error] process exited with code {code}")],
                )
            }
            (WorkerExit::SpawnFailed(message), false) => (
                JobState::Failed,
                vec![format!("[error] failed to start worker: {message}")],
            ),
            (WorkerExit::Unavailable, false) => {
                (JobState::Failed, vec![NO_INTERPRETER_LINE.to_string()])
            }
        };

        if state != JobState::Succeeded {
            remove_file_best_effort(entry.output_path()).await;
        }
        self.settle(entry, state, lines);
    }

    /// Claim the terminal transition. False if someone else already did.
    fn claim(&self, entry: &JobEntry) -> bool {
        let mut inner = entry.lock();
        if inner.resolving || inner.state.is_terminal() {
            return false;
        }
        inner.resolving = true;
        true
    }

    /// Publish a terminal state. Caller must hold the claim.
    fn settle(&self, entry: &JobEntry, state: JobState, mut lines: Vec<String>) {
        if state == JobState::Stopped {
            lines.push(STOPPED_LINE.to_string());
        }
        {
            let mut inner = entry.lock();
            for line in &lines {
                entry.lines.push(line);
            }
            if state == JobState::Succeeded {
                inner.download_token = Some(Uuid::new_v4().to_string());
            }
            inner.worker = None;
            entry.publish(&mut inner, state);
            self.arm_retention(entry, &mut inner);
        }

        metrics::counter!("jobs_finished_total", "outcome" => state.as_str()).increment(1);
        let runtime_ms = (Utc::now() - entry.created_at()).num_milliseconds();
        tracing::info!(
            job_id = %entry.id(),
            outcome = state.as_str(),
            runtime_ms,
            "job finished"
        );
    }

    fn arm_retention(&self, entry: &JobEntry, inner: &mut JobInner) {
        retention::arm(&self.registry, entry, inner, self.config.retention);
    }

    /// Look up a job and check who owns it.
    fn owned(&self, job_id: &JobId, owner: &OwnerId) -> JobResult<Arc<JobEntry>> {
        let entry = self
            .registry
            .get(job_id)
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;
        if entry.owner() != owner {
            return Err(JobError::Forbidden(job_id.to_string()));
        }
        Ok(entry)
    }

    /// Drop a job whose artifact is already gone.
    fn forget(&self, entry: &JobEntry) {
        if let Some(timer) = entry.lock().retention.take() {
            timer.cancel();
        }
        self.registry.remove(&entry.id());
        tracing::debug!(job_id = %entry.id(), "artifact missing, job forgotten");
    }
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Paths a job with `job_id` would use under `work_dir`.
pub fn job_paths(work_dir: &std::path::Path, job_id: &JobId, extension: &str) -> (PathBuf, PathBuf) {
    (
        work_dir.join(format!("{job_id}{extension}")),
        work_dir.join(format!("{job_id}{OUTPUT_SUFFIX}")),
    )
}
