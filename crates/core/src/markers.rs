// crates/core/src/markers.rs
//! Filtering of worker output down to high-level status markers.

/// Line prefixes the worker uses for status worth showing to a user.
pub const RECOGNIZED_PREFIXES: &[&str] = &[
    "[start]",
    "[progress]",
    "[alert]",
    "[done]",
    "[info]",
    "[error]",
    "[stopped]",
];

/// Tag prepended to recognized lines that arrived on stderr.
pub const STDERR_TAG: &str = "[stderr]";

/// Substrings that mark stderr chatter to hide even when it looks like status
/// (model weight download progress).
pub const DEFAULT_STDERR_NOISE: &[&str] = &["Downloading"];

/// Whether `line` starts with one of [`RECOGNIZED_PREFIXES`].
pub fn is_recognized(line: &str) -> bool {
    let line = line.trim_start();
    RECOGNIZED_PREFIXES.iter().any(|p| line.starts_with(p))
}

/// Decides which raw worker lines reach a job's line buffer.
#[derive(Debug, Clone)]
pub struct MarkerFilter {
    stderr_noise: Vec<String>,
}

impl MarkerFilter {
    pub fn new<I, S>(stderr_noise: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            stderr_noise: stderr_noise.into_iter().map(Into::into).collect(),
        }
    }

    /// Recognized stdout lines pass through trimmed; everything else is dropped.
    pub fn stdout(&self, line: &str) -> Option<String> {
        let line = line.trim();
        is_recognized(line).then(|| line.to_string())
    }

    /// Noise is dropped unconditionally, recognized lines are tagged.
    pub fn stderr(&self, line: &str) -> Option<String> {
        if self.stderr_noise.iter().any(|n| line.contains(n.as_str())) {
            return None;
        }
        let line = line.trim();
        is_recognized(line).then(|| format!("{STDERR_TAG} {line}"))
    }
}

impl Default for MarkerFilter {
    fn default() -> Self {
        Self::new(DEFAULT_STDERR_NOISE.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_recognized_prefixes() {
        for line in [
            "[start] input=a.mp4",
            "[progress] frame=25",
            "[alert] violence detected",
            "[done] saved=out.mp4",
            "[info] model loaded",
            "[error] Cannot open video.",
            "[stopped] bye",
        ] {
            assert!(is_recognized(line), "{line}");
        }
        assert!(!is_recognized("0: 384x640 1 person, 41.2ms"));
        assert!(!is_recognized("Speed: 1.0ms preprocess"));
        assert!(!is_recognized("start without brackets"));
    }

    #[test]
    fn test_stdout_passes_markers_verbatim() {
        let f = MarkerFilter::default();
        assert_eq!(
            f.stdout("[progress] frame=50\n"),
            Some("[progress] frame=50".to_string())
        );
        assert_eq!(f.stdout("image 1/1 person"), None);
    }

    #[test]
    fn test_stderr_tags_markers() {
        let f = MarkerFilter::default();
        assert_eq!(
            f.stderr("[error] codec missing"),
            Some("[stderr] [error] codec missing".to_string())
        );
        assert_eq!(f.stderr("Traceback (most recent call last):"), None);
    }

    #[test]
    fn test_stderr_noise_dropped_even_with_marker_prefix() {
        let f = MarkerFilter::default();
        assert_eq!(f.stderr("[info] Downloading yolov8m-pose.pt 42%"), None);
        assert_eq!(f.stderr("Downloading https://example/weights"), None);
    }

    #[test]
    fn test_stdout_does_not_apply_stderr_noise() {
        let f = MarkerFilter::default();
        assert!(f.stdout("[info] Downloading finished").is_some());
    }

    #[test]
    fn test_custom_noise() {
        let f = MarkerFilter::new(["deprecated"]);
        assert_eq!(f.stderr("[info] deprecated option"), None);
        assert!(f.stderr("[info] Downloading").is_some());
    }
}
