// crates/server/src/routes/mod.rs
//! API route handlers for the reelwatch server.
//!
//! - GET  /api/health: liveness, version, worker availability
//! - GET  /api/metrics: Prometheus scrape
//! - POST /api/jobs: submit an upload
//! - GET  /api/jobs/{id}/status: poll a job
//! - POST /api/jobs/{id}/stop: stop a job
//! - GET  /api/downloads/{token}: one-shot artifact download

pub mod downloads;
pub mod health;
pub mod jobs;
pub mod metrics;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the API router with all routes under `/api`.
pub fn api_routes(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .merge(health::router())
        .merge(metrics::router())
        .merge(jobs::router())
        .merge(downloads::router());
    Router::new().nest("/api", api).with_state(state)
}
