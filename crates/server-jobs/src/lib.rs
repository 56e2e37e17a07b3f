// crates/server-jobs/src/lib.rs
//! Upload-to-artifact job system.
//!
//! [`JobManager`] owns a [`JobRegistry`] of jobs, each backed by one worker
//! process. Callers poll for output lines, stop jobs, and download the
//! artifact exactly once; unclaimed artifacts expire after the retention
//! window.

pub mod config;
pub mod download;
pub mod entry;
pub mod error;
mod fsutil;
pub mod manager;
pub mod registry;
pub mod retention;
pub mod supervisor;
pub mod types;

pub use config::{JobConfig, WorkerCommand, DEFAULT_RETENTION};
pub use download::ArtifactDownload;
pub use entry::JobEntry;
pub use error::{JobError, JobResult};
pub use manager::JobManager;
pub use registry::JobRegistry;
pub use types::{JobId, JobSnapshot, JobState, OwnerId, Upload, WorkerExit};
