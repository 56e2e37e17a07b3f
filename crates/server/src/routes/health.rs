// crates/server/src/routes/health.rs
//! Health check endpoint for the API.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Response for the health check endpoint.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub active_jobs: usize,
    /// Worker program, or `None` when jobs cannot run on this host.
    pub worker: Option<String>,
}

/// GET /api/health - Health check endpoint.
///
/// Reports `degraded` when no worker interpreter was found.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let worker = state.worker_program().map(|p| p.display().to_string());
    Json(HealthResponse {
        status: if worker.is_some() { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
        active_jobs: state.jobs.active_jobs(),
        worker,
    })
}

/// Create the health routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_check))
}
