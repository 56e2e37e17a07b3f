// crates/server-process-tree/src/handle.rs
//! Handle to a running worker process.

use tokio::sync::watch;

/// Cloneable reference to a worker process.
///
/// The task that owns the `Child` keeps the paired [`ExitNotifier`] and fires
/// it once `wait()` returns. Dropping the notifier without firing also counts
/// as exited.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    pid: Option<u32>,
    exited: watch::Receiver<bool>,
}

/// Sender half paired with a [`WorkerHandle`].
#[derive(Debug)]
pub struct ExitNotifier {
    tx: watch::Sender<bool>,
}

impl WorkerHandle {
    pub fn new(pid: Option<u32>) -> (Self, ExitNotifier) {
        let (tx, exited) = watch::channel(false);
        (Self { pid, exited }, ExitNotifier { tx })
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn has_exited(&self) -> bool {
        *self.exited.borrow() || self.exited.has_changed().is_err()
    }

    /// Resolve once the process has been reaped.
    pub async fn wait_exited(&self) {
        let mut rx = self.exited.clone();
        // Err means the notifier was dropped, which also means gone.
        let _ = rx.wait_for(|exited| *exited).await;
    }
}

impl ExitNotifier {
    pub fn notify(self) {
        let _ = self.tx.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_notify_marks_exited() {
        let (handle, notifier) = WorkerHandle::new(Some(42));
        assert!(!handle.has_exited());
        assert_eq!(handle.pid(), Some(42));

        let waiter = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.wait_exited().await })
        };
        notifier.notify();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("wait_exited should resolve")
            .unwrap();
        assert!(handle.has_exited());
    }

    #[tokio::test]
    async fn test_dropped_notifier_counts_as_exited() {
        let (handle, notifier) = WorkerHandle::new(None);
        drop(notifier);
        assert!(handle.has_exited());
        tokio::time::timeout(Duration::from_millis(100), handle.wait_exited())
            .await
            .expect("dropped notifier should not hang waiters");
    }
}
