// crates/server-jobs/src/fsutil.rs
//! Best-effort file cleanup. Failures are logged and swallowed.

use std::io::ErrorKind;
use std::path::Path;

pub async fn remove_file_best_effort(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "removed job file"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove job file"),
    }
}

/// Blocking variant for `Drop` impls.
pub fn remove_file_best_effort_sync(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "removed job file"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove job file"),
    }
}

pub async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_remove_missing_file_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.mp4");
        remove_file_best_effort(&path).await;
        remove_file_best_effort_sync(&path);
        assert!(!exists(&path).await);
    }

    #[tokio::test]
    async fn test_remove_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.mp4");
        std::fs::write(&path, b"x").unwrap();
        assert!(exists(&path).await);
        remove_file_best_effort(&path).await;
        assert!(!exists(&path).await);
    }
}
