// crates/server-jobs/src/retention.rs
//! Deferred deletion of finished jobs that nobody downloaded.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::entry::{JobEntry, JobInner};
use crate::fsutil::remove_file_best_effort;
use crate::registry::JobRegistry;
use crate::types::JobId;

/// A pending expiry for one job. Stored on the job entry.
#[derive(Debug)]
pub struct RetentionTimer {
    handle: JoinHandle<()>,
}

impl RetentionTimer {
    /// Schedule [`expire`] for `job_id` after `window`.
    pub fn schedule(registry: Arc<JobRegistry>, job_id: JobId, window: Duration) -> Self {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            expire(&registry, job_id).await;
        });
        Self { handle }
    }

    /// Abort the pending expiry. A timer that already fired is unaffected.
    pub fn cancel(self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Replace any pending expiry on `entry` with a fresh one. Caller holds the
/// entry lock.
pub(crate) fn arm(
    registry: &Arc<JobRegistry>,
    entry: &JobEntry,
    inner: &mut JobInner,
    window: Duration,
) {
    if let Some(previous) = inner.retention.take() {
        previous.cancel();
    }
    inner.retention = Some(RetentionTimer::schedule(
        Arc::clone(registry),
        entry.id(),
        window,
    ));
}

/// Delete a job's residual output and forget the job.
///
/// Skipped while a download stream owns the artifact; the stream cleans up
/// when it ends.
pub async fn expire(registry: &JobRegistry, job_id: JobId) {
    let Some(entry) = registry.get(&job_id) else {
        return;
    };
    if entry.lock().downloading {
        return;
    }
    remove_file_best_effort(entry.output_path()).await;
    if registry.remove(&job_id).is_some() {
        metrics::counter!("jobs_expired_total").increment(1);
        tracing::info!(
            job_id = %job_id,
            state = entry.state().as_str(),
            "job expired after retention window"
        );
    }
}
