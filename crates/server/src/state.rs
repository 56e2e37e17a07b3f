// crates/server/src/state.rs
//! Application state for the Axum server.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use reelwatch_server_jobs::JobManager;

/// Shared application state accessible from all route handlers.
#[derive(Debug)]
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Owns every job and its worker.
    pub jobs: Arc<JobManager>,
}

impl AppState {
    /// Create a new application state wrapped in an Arc for sharing.
    pub fn new(jobs: Arc<JobManager>) -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            jobs,
        })
    }

    /// Get the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Program the jobs run, if one was resolved.
    pub fn worker_program(&self) -> Option<PathBuf> {
        self.jobs.worker().map(|w| w.program.clone())
    }
}
