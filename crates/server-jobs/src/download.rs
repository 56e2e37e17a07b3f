// crates/server-jobs/src/download.rs
//! One-shot artifact delivery.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use tokio::fs::File;
use tokio_stream::{Stream, StreamExt};
use tokio_util::io::ReaderStream;

use crate::fsutil::remove_file_best_effort_sync;
use crate::registry::JobRegistry;
use crate::types::JobId;

/// An opened artifact, ready to stream to the requester.
///
/// Whatever happens to the stream (fully sent, errored, client disconnected),
/// dropping it deletes the file and forgets the job.
#[derive(Debug)]
pub struct ArtifactDownload {
    file: File,
    file_name: String,
    len: Option<u64>,
    guard: DownloadGuard,
}

impl ArtifactDownload {
    pub(crate) fn new(file: File, file_name: String, len: Option<u64>, guard: DownloadGuard) -> Self {
        Self {
            file,
            file_name,
            len,
            guard,
        }
    }

    /// Name to advertise in `Content-Disposition`.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_length(&self) -> Option<u64> {
        self.len
    }

    pub fn job_id(&self) -> JobId {
        self.guard.job_id
    }

    /// Byte stream over the file. Cleanup runs when the stream is dropped.
    pub fn into_stream(self) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
        let guard = self.guard;
        ReaderStream::new(self.file).map(move |chunk| {
            let _held = &guard;
            chunk
        })
    }
}

#[derive(Debug)]
pub(crate) struct DownloadGuard {
    registry: Arc<JobRegistry>,
    job_id: JobId,
    path: PathBuf,
}

impl DownloadGuard {
    pub(crate) fn new(registry: Arc<JobRegistry>, job_id: JobId, path: PathBuf) -> Self {
        Self {
            registry,
            job_id,
            path,
        }
    }
}

impl Drop for DownloadGuard {
    fn drop(&mut self) {
        remove_file_best_effort_sync(&self.path);
        self.registry.remove(&self.job_id);
        tracing::info!(job_id = %self.job_id, "download finished, job cleaned up");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::JobEntry;
    use crate::types::OwnerId;

    async fn download_for(dir: &std::path::Path, body: &[u8]) -> (Arc<JobRegistry>, Arc<JobEntry>, ArtifactDownload) {
        let registry = Arc::new(JobRegistry::new());
        let entry = Arc::new(JobEntry::new(
            JobId::new(),
            OwnerId::new("erin"),
            dir.join("in.mp4"),
            dir.join("in_out.mp4"),
            500,
        ));
        std::fs::write(entry.output_path(), body).unwrap();
        registry.insert(Arc::clone(&entry));

        let file = File::open(entry.output_path()).await.unwrap();
        let guard = DownloadGuard::new(Arc::clone(&registry), entry.id(), entry.output_path().to_path_buf());
        let download = ArtifactDownload::new(file, "in_out.mp4".to_string(), Some(body.len() as u64), guard);
        (registry, entry, download)
    }

    #[tokio::test]
    async fn test_full_stream_then_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, entry, download) = download_for(dir.path(), b"frame-bytes").await;
        assert_eq!(download.file_name(), "in_out.mp4");
        assert_eq!(download.content_length(), Some(11));

        let mut stream = Box::pin(download.into_stream());
        let mut body = Vec::new();
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(body, b"frame-bytes");
        // Still held until the stream is dropped.
        assert!(registry.get(&entry.id()).is_some());

        drop(stream);
        assert!(registry.get(&entry.id()).is_none());
        assert!(!entry.output_path().exists());
    }

    #[tokio::test]
    async fn test_abandoned_stream_still_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, entry, download) = download_for(dir.path(), b"partial").await;

        let stream = download.into_stream();
        drop(stream);

        assert!(registry.is_empty());
        assert!(!entry.output_path().exists());
    }
}
