//! Typed object paths for pipeline artifacts.
//!
//! Every stage owns a prefix in the bucket and lays out its outputs the
//! same way: NDJSON chunks named by starting offset plus a `_manifest.json`
//! marker per date. Centralizing the layout here keeps the extractor, the
//! downstream worker contract, and the tests agreeing on one scheme:
//!
//! ```text
//! raw-data/{date}/offset_{N}.json
//! raw-data/{date}/_manifest.json
//! clean-data/{date}/offset_{N}.{ext}
//! clean-data/{date}/_manifest.json
//! telemetry/{date}/offset_{N}.json
//! last_checkpoint.json
//! ```

use chrono::NaiveDate;

use crate::error::{Error, Result};

/// Well-known path of the extractor checkpoint.
///
/// Deliberately not scoped by date: the checkpoint is a single scalar that
/// advances monotonically across runs until the feed is exhausted.
pub const CHECKPOINT_PATH: &str = "last_checkpoint.json";

/// Prefix for the extractor's raw NDJSON chunks.
pub const RAW_DATA_PREFIX: &str = "raw-data";

/// Prefix for per-chunk telemetry rows.
pub const TELEMETRY_PREFIX: &str = "telemetry";

/// Filename of the per-date stage manifest.
pub const MANIFEST_FILENAME: &str = "_manifest.json";

/// Typed paths for one stage's outputs under a bucket prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePaths {
    prefix: String,
}

impl StagePaths {
    /// Creates typed paths rooted at `prefix` (e.g. `raw-data`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the prefix is empty or contains
    /// traversal or control sequences.
    pub fn new(prefix: impl AsRef<str>) -> Result<Self> {
        let prefix = normalize_relative_path(prefix.as_ref())?;
        Ok(Self { prefix })
    }

    /// Typed paths for the extractor's raw-data prefix.
    #[must_use]
    pub fn raw_data() -> Self {
        Self {
            prefix: RAW_DATA_PREFIX.to_string(),
        }
    }

    /// Returns the stage prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the per-date directory prefix, with a trailing slash for
    /// listing.
    #[must_use]
    pub fn date_prefix(&self, date: NaiveDate) -> String {
        format!("{}/{date}/", self.prefix)
    }

    /// Returns the path of the chunk starting at `offset`.
    #[must_use]
    pub fn chunk(&self, date: NaiveDate, offset: u64) -> String {
        format!("{}/{date}/offset_{offset}.json", self.prefix)
    }

    /// Returns the basename of the chunk starting at `offset`, as listed in
    /// the stage manifest.
    #[must_use]
    pub fn chunk_filename(offset: u64) -> String {
        format!("offset_{offset}.json")
    }

    /// Returns the path of the per-date stage manifest.
    #[must_use]
    pub fn manifest(&self, date: NaiveDate) -> String {
        format!("{}/{date}/{MANIFEST_FILENAME}", self.prefix)
    }

    /// Resolves a manifest `files` entry to a full object path.
    #[must_use]
    pub fn resolve(&self, date: NaiveDate, filename: &str) -> String {
        format!("{}/{date}/{filename}", self.prefix)
    }
}

/// Returns the path of the telemetry row for the chunk at `offset`.
///
/// Each attempted chunk gets its own row object, which keeps the sink
/// append-only and retries idempotent.
#[must_use]
pub fn telemetry_row(date: NaiveDate, offset: u64) -> String {
    format!("{TELEMETRY_PREFIX}/{date}/offset_{offset}.json")
}

fn normalize_relative_path(path: &str) -> Result<String> {
    let normalized = path.trim().trim_matches('/').to_string();
    if normalized.is_empty() {
        return Err(Error::InvalidInput("path must not be empty".to_string()));
    }

    if normalized.contains('\\') {
        return Err(Error::InvalidInput(
            "backslashes are not allowed in paths".to_string(),
        ));
    }

    if normalized.contains('\n') || normalized.contains('\r') || normalized.contains('\0') {
        return Err(Error::InvalidInput(
            "control characters are not allowed in paths".to_string(),
        ));
    }

    for segment in normalized.split('/') {
        if segment == "." || segment == ".." {
            return Err(Error::InvalidInput(
                "path traversal is not allowed".to_string(),
            ));
        }
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 30).expect("valid date")
    }

    #[test]
    fn chunk_paths_match_layout() {
        let paths = StagePaths::raw_data();
        assert_eq!(
            paths.chunk(date(), 1000),
            "raw-data/2025-03-30/offset_1000.json"
        );
        assert_eq!(
            paths.manifest(date()),
            "raw-data/2025-03-30/_manifest.json"
        );
        assert_eq!(paths.date_prefix(date()), "raw-data/2025-03-30/");
        assert_eq!(StagePaths::chunk_filename(0), "offset_0.json");
    }

    #[test]
    fn resolve_joins_manifest_entries() {
        let paths = StagePaths::new("clean-data").expect("valid prefix");
        assert_eq!(
            paths.resolve(date(), "offset_0.parquet"),
            "clean-data/2025-03-30/offset_0.parquet"
        );
    }

    #[test]
    fn telemetry_rows_are_per_offset() {
        assert_eq!(
            telemetry_row(date(), 2000),
            "telemetry/2025-03-30/offset_2000.json"
        );
    }

    #[test]
    fn prefix_validation_rejects_traversal() {
        assert!(StagePaths::new("../etc").is_err());
        assert!(StagePaths::new("a\\b").is_err());
        assert!(StagePaths::new("").is_err());
    }

    #[test]
    fn prefix_is_trimmed() {
        let paths = StagePaths::new("/raw-data/").expect("valid prefix");
        assert_eq!(paths.prefix(), "raw-data");
    }
}
