// crates/server-jobs/src/config.rs
//! Tunables for the job system. Defaults match the production deployment.

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use reelwatch_core::markers::DEFAULT_STDERR_NOISE;
use reelwatch_core::DEFAULT_LINE_CAP;

/// How long a finished job's artifact is kept if nobody downloads it.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(2 * 60);

/// How long to keep reading worker output after the process exits.
pub const DEFAULT_STREAM_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Media types accepted for upload.
pub const DEFAULT_ALLOWED_MEDIA_TYPES: &[&str] = &["video/mp4", "video/quicktime"];

#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Directory holding job inputs and outputs.
    pub work_dir: PathBuf,
    pub retention: Duration,
    pub line_cap: usize,
    pub allowed_media_types: Vec<String>,
    pub stream_drain_timeout: Duration,
    pub stderr_noise: Vec<String>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir(),
            retention: DEFAULT_RETENTION,
            line_cap: DEFAULT_LINE_CAP,
            allowed_media_types: DEFAULT_ALLOWED_MEDIA_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            stream_drain_timeout: DEFAULT_STREAM_DRAIN_TIMEOUT,
            stderr_noise: DEFAULT_STDERR_NOISE.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl JobConfig {
    pub fn accepts(&self, media_type: &str) -> bool {
        self.allowed_media_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(media_type))
    }
}

/// The external program run for every job.
///
/// Invoked as `<program> <leading_args...> --input <in> --output <out>`.
#[derive(Debug, Clone)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub leading_args: Vec<OsString>,
    pub current_dir: Option<PathBuf>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.leading_args.push(arg.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = JobConfig::default();
        assert_eq!(config.retention, Duration::from_secs(120));
        assert_eq!(config.line_cap, 500);
        assert!(config.accepts("video/mp4"));
        assert!(config.accepts("VIDEO/QUICKTIME"));
        assert!(!config.accepts("image/png"));
    }

    #[test]
    fn test_worker_command_builder() {
        let cmd = WorkerCommand::new("python3").arg("main.py").current_dir("/srv");
        assert_eq!(cmd.leading_args, vec![OsString::from("main.py")]);
        assert_eq!(cmd.current_dir, Some(PathBuf::from("/srv")));
    }
}
