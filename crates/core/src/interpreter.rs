// crates/core/src/interpreter.rs
//! Worker interpreter discovery.
//!
//! The worker is a script run by an interpreter that may live anywhere: a
//! pyenv shim, the Windows `py` launcher, a per-user install. Resolution runs
//! once per process through a waterfall and the result is cached.

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use crate::error::InterpreterError;

/// Timeout for each probe subprocess (a wedged launcher must not stall startup).
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Asks an interpreter for the absolute path of its own executable.
const SELF_PATH_SNIPPET: &str = "import sys; print(sys.executable)";

#[cfg(windows)]
const LAUNCHERS: &[&str] = &["py", "python"];
#[cfg(not(windows))]
const LAUNCHERS: &[&str] = &["python3", "python"];

/// Cached discovery result (process-lifetime singleton).
static RESOLVED_INTERPRETER: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Get the discovered interpreter, running discovery on first call.
pub fn resolved_interpreter() -> Option<&'static Path> {
    RESOLVED_INTERPRETER
        .get_or_init(|| match discover() {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(error = %e, "worker interpreter discovery failed");
                None
            }
        })
        .as_deref()
}

/// Resolve an interpreter, honouring an explicit override first.
///
/// An explicit path that exists is used as-is; a bare name is accepted if it
/// answers `--version`. Otherwise the cached discovery result is used.
pub fn resolve(explicit: Option<&Path>) -> Result<PathBuf, InterpreterError> {
    if let Some(path) = explicit {
        if path.exists() || answers_version(path) {
            return Ok(path.to_path_buf());
        }
        return Err(InterpreterError::ExplicitMissing {
            path: path.to_path_buf(),
        });
    }
    resolved_interpreter()
        .map(Path::to_path_buf)
        .ok_or_else(|| InterpreterError::NotFound {
            tried: LAUNCHERS.iter().map(|s| s.to_string()).collect(),
        })
}

/// Find the interpreter using a four-step waterfall.
///
/// 1. Launcher query: ask `py`/`python3`/`python` for `sys.executable`
/// 2. Direct probe: the first bare name that answers `--version`
/// 3. PATH search via `where`/`which`
/// 4. Scan of well-known install directories
pub fn discover() -> Result<PathBuf, InterpreterError> {
    for launcher in LAUNCHERS {
        if let Some(path) = query_launcher(launcher) {
            tracing::debug!(launcher, path = %path.display(), "interpreter found via launcher");
            return Ok(path);
        }
    }

    if let Some(path) = probe_direct(LAUNCHERS) {
        tracing::debug!(path = %path.display(), "interpreter found via version probe");
        return Ok(path);
    }

    if let Some(path) = search_path() {
        tracing::debug!(path = %path.display(), "interpreter found on PATH");
        return Ok(path);
    }

    if let Some(path) = scan_install_dirs(&install_roots()) {
        tracing::debug!(path = %path.display(), "interpreter found in install directory");
        return Ok(path);
    }

    Err(InterpreterError::NotFound {
        tried: LAUNCHERS.iter().map(|s| s.to_string()).collect(),
    })
}

/// Run a command with a timeout, returning None if it times out or fails to start.
pub(crate) fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Option<Output> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .ok()?;

    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(_)) => return child.wait_with_output().ok(),
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return None;
                }
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(_) => return None,
        }
    }
}

fn query_launcher(launcher: &str) -> Option<PathBuf> {
    let output = run_with_timeout(
        Command::new(launcher).args(["-c", SELF_PATH_SNIPPET]),
        PROBE_TIMEOUT,
    )?;
    if !output.status.success() {
        return None;
    }
    let path = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());
    (!path.as_os_str().is_empty() && path.exists()).then_some(path)
}

/// First name that runs and exits cleanly on `--version`, kept bare so the
/// OS resolves it at spawn time.
fn probe_direct(names: &[&str]) -> Option<PathBuf> {
    names
        .iter()
        .map(PathBuf::from)
        .find(|name| answers_version(name))
}

fn answers_version(program: &Path) -> bool {
    run_with_timeout(Command::new(program).arg("--version"), PROBE_TIMEOUT)
        .is_some_and(|o| o.status.success())
}

#[cfg(windows)]
fn search_path() -> Option<PathBuf> {
    let output = run_with_timeout(Command::new("where").arg("python"), PROBE_TIMEOUT)?;
    if !output.status.success() {
        return None;
    }
    first_existing_exe(&String::from_utf8_lossy(&output.stdout))
}

#[cfg(not(windows))]
fn search_path() -> Option<PathBuf> {
    for name in LAUNCHERS {
        let Some(output) = run_with_timeout(Command::new("which").arg(name), PROBE_TIMEOUT) else {
            continue;
        };
        if output.status.success() {
            let path = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());
            if !path.as_os_str().is_empty() && path.exists() {
                return Some(path);
            }
        }
    }
    None
}

/// Pick the first `.exe` line of `where` output that exists on disk.
#[cfg_attr(not(windows), allow(dead_code))]
fn first_existing_exe(where_output: &str) -> Option<PathBuf> {
    where_output
        .lines()
        .map(str::trim)
        .filter(|l| l.to_ascii_lowercase().ends_with(".exe"))
        .map(PathBuf::from)
        .find(|p| p.exists())
}

#[cfg(windows)]
fn install_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();
    if let Ok(local) = std::env::var("LOCALAPPDATA") {
        roots.push(PathBuf::from(local).join("Programs").join("Python"));
    }
    roots.push(PathBuf::from("C:\\"));
    roots
}

#[cfg(not(windows))]
fn install_roots() -> Vec<PathBuf> {
    let mut roots = vec![
        PathBuf::from("/usr/local/bin"),
        PathBuf::from("/usr/bin"),
        PathBuf::from("/opt/homebrew/bin"),
    ];
    if let Ok(home) = std::env::var("HOME") {
        roots.push(PathBuf::from(home).join(".local").join("bin"));
    }
    roots
}

/// Scan install roots for an interpreter.
///
/// Windows layouts are `<root>/Python3xx/python.exe`; elsewhere the root
/// itself is a bin directory holding `python3`.
fn scan_install_dirs(roots: &[PathBuf]) -> Option<PathBuf> {
    for root in roots {
        let direct = root.join("python3");
        if direct.is_file() {
            return Some(direct);
        }
        let Ok(entries) = std::fs::read_dir(root) else {
            continue;
        };
        let newest = entries
            .filter_map(Result::ok)
            .filter(|e| e.path().is_dir())
            .filter_map(|e| {
                let minor = python_minor_version(&e.file_name().to_string_lossy())?;
                let exe = e.path().join("python.exe");
                exe.is_file().then_some((minor, exe))
            })
            .max_by_key(|(minor, _)| *minor);
        if let Some((_, found)) = newest {
            return Some(found);
        }
    }
    None
}

/// `Python312` -> `Some(12)`.
fn python_minor_version(dir_name: &str) -> Option<u32> {
    let lower = dir_name.to_ascii_lowercase();
    let rest = lower.strip_prefix("python3")?;
    if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    rest.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_versioned_dir_names() {
        assert_eq!(python_minor_version("Python312"), Some(12));
        assert_eq!(python_minor_version("python39"), Some(9));
        assert_eq!(python_minor_version("Python3"), None);
        assert_eq!(python_minor_version("Python27"), None);
        assert_eq!(python_minor_version("Python312-beta"), None);
    }

    #[test]
    fn test_scan_prefers_bin_dir_entry() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("python3");
        std::fs::write(&exe, b"").unwrap();
        assert_eq!(scan_install_dirs(&[dir.path().to_path_buf()]), Some(exe));
    }

    #[test]
    fn test_scan_picks_newest_versioned_install() {
        let dir = tempfile::tempdir().unwrap();
        for v in ["Python39", "Python312", "Python311"] {
            let sub = dir.path().join(v);
            std::fs::create_dir(&sub).unwrap();
            std::fs::write(sub.join("python.exe"), b"").unwrap();
        }
        // Versioned dir without an interpreter inside is ignored.
        std::fs::create_dir(dir.path().join("Python313")).unwrap();

        let found = scan_install_dirs(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(found, dir.path().join("Python312").join("python.exe"));
    }

    #[test]
    fn test_scan_missing_roots() {
        assert_eq!(scan_install_dirs(&[PathBuf::from("/definitely/not/here")]), None);
    }

    #[test]
    fn test_first_existing_exe_skips_missing_and_non_exe() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("python.exe");
        std::fs::write(&exe, b"").unwrap();
        let listing = format!(
            "C:\\missing\\python.exe\r\n{}\r\nC:\\shim\\python\r\n",
            exe.display()
        );
        assert_eq!(first_existing_exe(&listing), Some(exe));
    }

    #[test]
    fn test_explicit_existing_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("worker");
        std::fs::write(&exe, b"").unwrap();
        assert_eq!(resolve(Some(&exe)).unwrap(), exe);
    }

    #[test]
    fn test_explicit_missing_path_errors() {
        let err = resolve(Some(Path::new("/no/such/interpreter-xyz"))).unwrap_err();
        assert!(matches!(err, InterpreterError::ExplicitMissing { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_direct_probe_skips_missing_names() {
        assert_eq!(
            probe_direct(&["no-such-interpreter-xyz", "true"]),
            Some(PathBuf::from("true"))
        );
        assert_eq!(probe_direct(&["no-such-interpreter-xyz"]), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_with_timeout_kills_slow_process() {
        let start = Instant::now();
        let out = run_with_timeout(
            Command::new("sh").args(["-c", "sleep 5"]),
            Duration::from_millis(200),
        );
        assert!(out.is_none());
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_with_timeout_captures_output() {
        let out = run_with_timeout(
            Command::new("sh").args(["-c", "echo hello"]),
            PROBE_TIMEOUT,
        )
        .unwrap();
        assert!(out.status.success());
        assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "hello");
    }
}
