// crates/server-process-tree/src/terminate.rs
//! Termination strategies.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::handle::WorkerHandle;
use crate::tree;

/// Time a worker gets to exit after the graceful request before force-kill.
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_millis(500);

#[cfg(unix)]
const GROUP_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Capability to stop a worker and its children.
///
/// The future resolves when the attempt is complete, whether or not the
/// process actually died. Terminating an exited handle is a no-op.
#[async_trait]
pub trait Terminate: Send + Sync + 'static {
    async fn terminate(&self, handle: &WorkerHandle);
}

/// Pick the strategy for this platform.
pub fn default_terminator(grace: Duration) -> Arc<dyn Terminate> {
    #[cfg(unix)]
    {
        Arc::new(ProcessGroupTerminator::new(grace))
    }
    #[cfg(not(unix))]
    {
        Arc::new(ProcessTreeTerminator::new(grace))
    }
}

async fn snapshot_descendants(pid: u32) -> Vec<u32> {
    tokio::task::spawn_blocking(move || tree::descendants(pid))
        .await
        .unwrap_or_default()
}

/// Signals the worker's process group: `SIGTERM`, then `SIGKILL` after the
/// grace window.
///
/// Requires workers to be spawned as group leaders (`process_group(0)`).
/// Descendants that moved to another group are signalled individually.
#[cfg(unix)]
#[derive(Debug, Clone)]
pub struct ProcessGroupTerminator {
    grace: Duration,
}

#[cfg(unix)]
impl ProcessGroupTerminator {
    pub fn new(grace: Duration) -> Self {
        Self { grace }
    }

    fn signal(pgid: u32, escaped: &[u32], sig: nix::sys::signal::Signal) {
        use nix::sys::signal::{kill, killpg};
        use nix::unistd::Pid;

        if let Err(errno) = killpg(Pid::from_raw(pgid as i32), sig) {
            tracing::debug!(pgid, signal = ?sig, %errno, "killpg failed");
        }
        for pid in escaped {
            let _ = kill(Pid::from_raw(*pid as i32), sig);
        }
    }

    /// True while any member of the group, or any escaped descendant, is
    /// still around.
    fn any_alive(pgid: u32, escaped: &[u32]) -> bool {
        use nix::sys::signal::{kill, killpg};
        use nix::unistd::Pid;

        killpg(Pid::from_raw(pgid as i32), None).is_ok()
            || escaped
                .iter()
                .any(|pid| kill(Pid::from_raw(*pid as i32), None).is_ok())
    }
}

#[cfg(unix)]
#[async_trait]
impl Terminate for ProcessGroupTerminator {
    async fn terminate(&self, handle: &WorkerHandle) {
        use nix::sys::signal::Signal;

        if handle.has_exited() {
            return;
        }
        let Some(pid) = handle.pid() else {
            return;
        };

        let escaped = escaped_descendants(pid).await;
        tracing::debug!(pid, escaped = escaped.len(), "sending SIGTERM to worker group");
        Self::signal(pid, &escaped, Signal::SIGTERM);

        let deadline = tokio::time::Instant::now() + self.grace;
        if tokio::time::timeout_at(deadline, handle.wait_exited()).await.is_ok() {
            // The leader is gone but its children may still be running.
            while Self::any_alive(pid, &escaped) && tokio::time::Instant::now() < deadline {
                tokio::time::sleep(GROUP_POLL_INTERVAL).await;
            }
            if !Self::any_alive(pid, &escaped) {
                return;
            }
            tracing::info!(pid, "worker children outlived the leader, sending SIGKILL");
        } else {
            tracing::info!(pid, grace_ms = self.grace.as_millis() as u64, "worker ignored SIGTERM, escalating to SIGKILL");
        }
        Self::signal(pid, &escaped, Signal::SIGKILL);
    }
}

/// Descendants whose process group differs from the worker's.
#[cfg(unix)]
async fn escaped_descendants(pgid: u32) -> Vec<u32> {
    use nix::unistd::{getpgid, Pid};

    snapshot_descendants(pgid)
        .await
        .into_iter()
        .filter(|pid| {
            getpgid(Some(Pid::from_raw(*pid as i32)))
                .map(|g| g.as_raw() as u32 != pgid)
                .unwrap_or(false)
        })
        .collect()
}

/// Walks the process table and kills the worker's descendants and then the
/// worker itself. Used where process groups are unavailable.
#[derive(Debug, Clone)]
pub struct ProcessTreeTerminator {
    grace: Duration,
}

impl ProcessTreeTerminator {
    pub fn new(grace: Duration) -> Self {
        Self { grace }
    }
}

#[async_trait]
impl Terminate for ProcessTreeTerminator {
    async fn terminate(&self, handle: &WorkerHandle) {
        if handle.has_exited() {
            return;
        }
        let Some(pid) = handle.pid() else {
            return;
        };

        // Root last so children are not reparented mid-walk.
        let mut targets = snapshot_descendants(pid).await;
        targets.insert(0, pid);

        let graceful = {
            let targets = targets.clone();
            tokio::task::spawn_blocking(move || tree::term_all(&targets))
                .await
                .unwrap_or(false)
        };
        if graceful && tokio::time::timeout(self.grace, handle.wait_exited()).await.is_ok() {
            return;
        }

        tracing::debug!(pid, targets = targets.len(), "force-killing worker tree");
        let _ = tokio::task::spawn_blocking(move || tree::kill_all(&targets)).await;
    }
}
