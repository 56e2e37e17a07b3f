// crates/server/src/main.rs
//! Reelwatch server binary.
//!
//! Resolves the worker interpreter once, then serves the HTTP API until
//! SIGINT/SIGTERM. On shutdown every running worker is killed and every job
//! file deleted.

use anyhow::{Context, Result};
use clap::Parser;
use reelwatch_server_process_tree::default_terminator;
use reelwatch_server::{create_app, init_metrics, AppState, ServerConfig};
use reelwatch_server_jobs::JobManager;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::parse();
    let _log_guard = reelwatch_observability::init_tracing(&config.log_config())?;

    init_metrics();

    let job_config = config.job_config();
    tokio::fs::create_dir_all(&job_config.work_dir)
        .await
        .with_context(|| format!("creating work dir {}", job_config.work_dir.display()))?;

    let explicit = config.worker_program.clone();
    let interpreter = tokio::task::spawn_blocking(move || {
        reelwatch_core::resolve_interpreter(explicit.as_deref())
    })
    .await?;
    let worker = match interpreter {
        Ok(program) => {
            tracing::info!(program = %program.display(), "worker interpreter resolved");
            Some(config.worker_command(&program))
        }
        Err(e) => {
            tracing::warn!(error = %e, "no worker interpreter, every job will fail");
            None
        }
    };

    let jobs = JobManager::new(job_config, worker, default_terminator(config.kill_grace()));
    let state = AppState::new(jobs.clone());
    let app = create_app(state, config.max_upload_bytes());

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, version = env!("CARGO_PKG_VERSION"), "reelwatch listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    jobs.shutdown().await;
    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
