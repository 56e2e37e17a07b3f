// crates/server/src/config.rs
//! Command-line and environment configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use reelwatch_observability::{LogConfig, LogFormat, DEFAULT_FILTER};
use reelwatch_server_jobs::{JobConfig, WorkerCommand};

/// Default port for the server.
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, Parser)]
#[command(name = "reelwatch", version, about = "Video analysis job server")]
pub struct ServerConfig {
    /// Address to bind.
    #[arg(long, env = "REELWATCH_HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Port to listen on (`PORT` is honoured too).
    #[arg(long, env = "REELWATCH_PORT", default_value_t = default_port())]
    pub port: u16,

    /// Directory for uploads and artifacts. Defaults to the OS temp dir.
    #[arg(long, env = "REELWATCH_WORK_DIR")]
    pub work_dir: Option<PathBuf>,

    /// Seconds a finished job's artifact stays downloadable.
    #[arg(long, env = "REELWATCH_RETENTION_SECS", default_value_t = 120)]
    pub retention_secs: u64,

    /// Maximum buffered output lines per job.
    #[arg(long, env = "REELWATCH_LINE_CAP", default_value_t = 500)]
    pub line_cap: usize,

    /// Milliseconds between the graceful and the forced kill on stop.
    #[arg(long, env = "REELWATCH_KILL_GRACE_MS", default_value_t = 500)]
    pub kill_grace_ms: u64,

    /// Largest accepted upload in MiB.
    #[arg(long, env = "REELWATCH_MAX_UPLOAD_MB", default_value_t = 100)]
    pub max_upload_mb: usize,

    /// Worker interpreter. Discovered on the system when unset.
    #[arg(long, env = "REELWATCH_WORKER_PROGRAM")]
    pub worker_program: Option<PathBuf>,

    /// Script passed to the interpreter. Empty runs the program directly.
    #[arg(long, env = "REELWATCH_WORKER_SCRIPT", default_value = "main.py")]
    pub worker_script: String,

    /// Working directory for the worker.
    #[arg(long, env = "REELWATCH_WORKER_DIR")]
    pub worker_dir: Option<PathBuf>,

    /// Log filter directives (overridden by `RUST_LOG`).
    #[arg(long, env = "REELWATCH_LOG", default_value = DEFAULT_FILTER)]
    pub log_filter: String,

    /// `compact` or `json`.
    #[arg(long, env = "REELWATCH_LOG_FORMAT", default_value = "compact")]
    pub log_format: LogFormat,

    /// Also write logs to a daily rolling file in this directory.
    #[arg(long, env = "REELWATCH_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

fn default_port() -> u16 {
    std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

impl ServerConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }

    pub fn job_config(&self) -> JobConfig {
        let defaults = JobConfig::default();
        JobConfig {
            work_dir: self.work_dir.clone().unwrap_or(defaults.work_dir.clone()),
            retention: Duration::from_secs(self.retention_secs),
            line_cap: self.line_cap,
            ..defaults
        }
    }

    /// Worker command for a resolved interpreter.
    pub fn worker_command(&self, interpreter: &Path) -> WorkerCommand {
        let mut command = WorkerCommand::new(interpreter);
        if !self.worker_script.is_empty() {
            command = command.arg(&self.worker_script);
        }
        if let Some(dir) = &self.worker_dir {
            command = command.current_dir(dir);
        }
        command
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            filter: self.log_filter.clone(),
            format: self.log_format,
            log_dir: self.log_dir.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    fn parse(args: &[&str]) -> ServerConfig {
        ServerConfig::try_parse_from(std::iter::once("reelwatch").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["--port", "3000"]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.max_upload_bytes(), 100 * 1024 * 1024);
        assert_eq!(config.kill_grace(), Duration::from_millis(500));

        let jobs = config.job_config();
        assert_eq!(jobs.retention, Duration::from_secs(120));
        assert_eq!(jobs.line_cap, 500);
    }

    #[test]
    fn test_worker_command_with_script_and_dir() {
        let config = parse(&["--worker-dir", "/srv/pose", "--worker-script", "analyze.py"]);
        let command = config.worker_command(Path::new("/usr/bin/python3"));
        assert_eq!(command.program, PathBuf::from("/usr/bin/python3"));
        assert_eq!(command.leading_args, vec![OsString::from("analyze.py")]);
        assert_eq!(command.current_dir, Some(PathBuf::from("/srv/pose")));
    }

    #[test]
    fn test_empty_script_runs_program_directly() {
        let config = parse(&["--worker-script", ""]);
        let command = config.worker_command(Path::new("/opt/worker"));
        assert!(command.leading_args.is_empty());
    }

    #[test]
    fn test_log_format_flag() {
        let config = parse(&["--log-format", "json"]);
        assert_eq!(config.log_config().format, LogFormat::Json);
        assert!(ServerConfig::try_parse_from(["reelwatch", "--log-format", "xml"]).is_err());
    }
}
