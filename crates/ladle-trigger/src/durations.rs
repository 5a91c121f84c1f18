//! Per-origin stage duration logs.
//!
//! Events carrying a `duration` get a `{date},{event},{duration}` line
//! appended to `duration_{origin}.log`. Append failures are logged by the
//! caller and never fail the request — the log is an operator aid, not
//! pipeline state.

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::PathBuf;

/// Appends duration lines to per-origin log files.
#[derive(Debug, Clone)]
pub struct DurationLog {
    dir: PathBuf,
}

impl DurationLog {
    /// Creates a duration log rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Appends one `{date},{event},{duration}` line for `origin`.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the directory or file cannot be written.
    pub fn append(&self, origin: &str, date: &str, event: &str, duration: f64) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let filename = self.dir.join(format!("duration_{}.log", sanitize(origin)));
        let mut file = OpenOptions::new().append(true).create(true).open(filename)?;
        writeln!(file, "{date},{event},{duration:.3}")
    }
}

/// Origins come off the wire; keep filenames boring.
fn sanitize(origin: &str) -> String {
    let cleaned: String = origin
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}
