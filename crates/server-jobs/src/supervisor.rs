// crates/server-jobs/src/supervisor.rs
//! Launches a worker process for a job and watches it until exit.
//!
//! One task per output stream feeds filtered lines into the job's buffer; a
//! third task owns the `Child`, reaps it, and reports a [`WorkerExit`] once
//! the streams have drained (or the drain timeout passed).

use std::io;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use reelwatch_core::MarkerFilter;
use reelwatch_server_process_tree::WorkerHandle;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::oneshot;
use tokio::task::JoinSet;

use crate::config::WorkerCommand;
use crate::entry::JobEntry;
use crate::types::WorkerExit;

/// A launched worker.
#[derive(Debug)]
pub struct RunningWorker {
    pub handle: WorkerHandle,
    /// Fires exactly once with the exit report.
    pub exit: oneshot::Receiver<WorkerExit>,
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    fn as_str(self) -> &'static str {
        match self {
            Stream::Stdout => "stdout",
            Stream::Stderr => "stderr",
        }
    }
}

/// Build the command line for one job.
fn build_command(worker: &WorkerCommand, entry: &JobEntry) -> Command {
    let mut cmd = Command::new(&worker.program);
    cmd.args(&worker.leading_args)
        .arg("--input")
        .arg(entry.input_path())
        .arg("--output")
        .arg(entry.output_path())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = &worker.current_dir {
        cmd.current_dir(dir);
    }
    // Own process group so the whole tree can be signalled at once.
    #[cfg(unix)]
    cmd.process_group(0);
    cmd
}

/// Spawn the worker for `entry`.
///
/// `Err` means the process never started; the caller turns that into
/// [`WorkerExit::SpawnFailed`].
pub fn launch(
    worker: &WorkerCommand,
    entry: &Arc<JobEntry>,
    filter: &MarkerFilter,
    drain_timeout: Duration,
) -> io::Result<RunningWorker> {
    let mut child = build_command(worker, entry).spawn()?;
    let pid = child.id();
    let (handle, notifier) = WorkerHandle::new(pid);

    let mut pumps = JoinSet::new();
    if let Some(stdout) = child.stdout.take() {
        pumps.spawn(pump(stdout, Stream::Stdout, Arc::clone(entry), filter.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        pumps.spawn(pump(stderr, Stream::Stderr, Arc::clone(entry), filter.clone()));
    }

    tracing::info!(job_id = %entry.id(), pid = ?pid, program = %worker.program.display(), "worker started");

    let (exit_tx, exit_rx) = oneshot::channel();
    let job_id = entry.id();
    tokio::spawn(async move {
        let code = match child.wait().await {
            Ok(status) => status.code(),
            Err(e) => {
                tracing::warn!(job_id = %job_id, error = %e, "failed to wait for worker");
                None
            }
        };
        notifier.notify();

        let drained = tokio::time::timeout(drain_timeout, async {
            while pumps.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            // A descendant still holds the pipe open.
            tracing::debug!(job_id = %job_id, "output streams still open after drain timeout");
            pumps.abort_all();
        }

        tracing::info!(job_id = %job_id, code = ?code, "worker exited");
        let _ = exit_tx.send(WorkerExit::Exited { code });
    });

    Ok(RunningWorker {
        handle,
        exit: exit_rx,
    })
}

async fn pump<R>(reader: R, stream: Stream, entry: Arc<JobEntry>, filter: MarkerFilter)
where
    R: AsyncRead + Unpin,
{
    let mut segments = BufReader::new(reader).split(b'\n');
    loop {
        match segments.next_segment().await {
            Ok(Some(raw)) => {
                let text = String::from_utf8_lossy(&raw);
                let line = match stream {
                    Stream::Stdout => filter.stdout(&text),
                    Stream::Stderr => filter.stderr(&text),
                };
                if let Some(line) = line {
                    entry.lines.push(line);
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(
                    job_id = %entry.id(),
                    stream = stream.as_str(),
                    error = %e,
                    "worker output stream failed"
                );
                break;
            }
        }
    }
}
