// crates/server-jobs/src/registry.rs
//! The authoritative in-memory map of jobs.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::entry::JobEntry;
use crate::types::JobId;

/// Owner of every [`JobEntry`].
///
/// Uses `std::sync::RwLock` (not `tokio::sync::RwLock`) because the lock is
/// never held across an `.await`; operations on different jobs only share it
/// for the duration of a map lookup.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Arc<JobEntry>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, entry: Arc<JobEntry>) {
        let len = match self.jobs.write() {
            Ok(mut jobs) => {
                jobs.insert(entry.id(), entry);
                jobs.len()
            }
            Err(e) => {
                tracing::error!("RwLock poisoned writing jobs map: {e}");
                return;
            }
        };
        metrics::gauge!("jobs_active").set(len as f64);
    }

    pub fn get(&self, id: &JobId) -> Option<Arc<JobEntry>> {
        match self.jobs.read() {
            Ok(jobs) => jobs.get(id).cloned(),
            Err(e) => {
                tracing::error!("RwLock poisoned reading jobs map: {e}");
                None
            }
        }
    }

    /// Remove a job. Returns `None` if something else removed it first.
    pub fn remove(&self, id: &JobId) -> Option<Arc<JobEntry>> {
        let (removed, len) = match self.jobs.write() {
            Ok(mut jobs) => {
                let removed = jobs.remove(id);
                (removed, jobs.len())
            }
            Err(e) => {
                tracing::error!("RwLock poisoned writing jobs map: {e}");
                return None;
            }
        };
        metrics::gauge!("jobs_active").set(len as f64);
        removed
    }

    /// Find the job whose current download token equals `token`.
    pub fn find_by_token(&self, token: &str) -> Option<Arc<JobEntry>> {
        self.snapshot()
            .into_iter()
            .find(|entry| entry.download_token().as_deref() == Some(token))
    }

    /// All entries, cloned out so per-entry locks are taken without the map lock.
    pub fn snapshot(&self) -> Vec<Arc<JobEntry>> {
        match self.jobs.read() {
            Ok(jobs) => jobs.values().cloned().collect(),
            Err(e) => {
                tracing::error!("RwLock poisoned reading jobs map: {e}");
                Vec::new()
            }
        }
    }

    /// Remove and return every entry.
    pub fn drain(&self) -> Vec<Arc<JobEntry>> {
        let drained = match self.jobs.write() {
            Ok(mut jobs) => jobs.drain().map(|(_, e)| e).collect(),
            Err(e) => {
                tracing::error!("RwLock poisoned writing jobs map: {e}");
                Vec::new()
            }
        };
        metrics::gauge!("jobs_active").set(0.0);
        drained
    }

    pub fn len(&self) -> usize {
        self.jobs.read().map(|j| j.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of jobs whose worker has not finished.
    pub fn running(&self) -> usize {
        self.snapshot()
            .iter()
            .filter(|e| !e.state().is_terminal())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{JobState, OwnerId};
    use std::path::PathBuf;

    fn entry() -> Arc<JobEntry> {
        Arc::new(JobEntry::new(
            JobId::new(),
            OwnerId::new("bob"),
            PathBuf::from("/tmp/a.mp4"),
            PathBuf::from("/tmp/a_out.mp4"),
            500,
        ))
    }

    #[test]
    fn test_insert_get_remove() {
        let registry = JobRegistry::new();
        let e = entry();
        registry.insert(Arc::clone(&e));
        assert_eq!(registry.len(), 1);
        assert!(registry.get(&e.id()).is_some());

        assert!(registry.remove(&e.id()).is_some());
        // Second remover loses the race.
        assert!(registry.remove(&e.id()).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_find_by_token() {
        let registry = JobRegistry::new();
        let a = entry();
        let b = entry();
        b.lock().download_token = Some("tok-b".to_string());
        registry.insert(Arc::clone(&a));
        registry.insert(Arc::clone(&b));

        let found = registry.find_by_token("tok-b").unwrap();
        assert_eq!(found.id(), b.id());
        assert!(registry.find_by_token("tok-a").is_none());
    }

    #[test]
    fn test_running_counts_non_terminal() {
        let registry = JobRegistry::new();
        let a = entry();
        let b = entry();
        {
            let mut inner = b.lock();
            b.publish(&mut inner, JobState::Succeeded);
        }
        registry.insert(a);
        registry.insert(b);
        assert_eq!(registry.running(), 1);
    }

    #[test]
    fn test_drain_empties() {
        let registry = JobRegistry::new();
        registry.insert(entry());
        registry.insert(entry());
        assert_eq!(registry.drain().len(), 2);
        assert!(registry.is_empty());
    }
}
