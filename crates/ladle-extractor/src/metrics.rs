//! Observability metrics for the extractor.
//!
//! Exported via the `metrics` crate facade. Install a recorder (e.g.
//! `metrics_exporter_prometheus`) in the binary to expose them.
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `ladle_extractor_chunks_total` | Counter | `result` | Attempted chunks by outcome |
//! | `ladle_extractor_rows_total` | Counter | `disposition` | Rows retained vs dropped |
//! | `ladle_extractor_run_duration_seconds` | Histogram | - | Wall-clock run duration |
//! | `ladle_extractor_feed_retries_total` | Counter | - | Feed fetch retries |

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    /// Counter: attempted chunks by outcome.
    pub const CHUNKS_TOTAL: &str = "ladle_extractor_chunks_total";
    /// Counter: rows retained vs dropped.
    pub const ROWS_TOTAL: &str = "ladle_extractor_rows_total";
    /// Histogram: wall-clock run duration in seconds.
    pub const RUN_DURATION_SECONDS: &str = "ladle_extractor_run_duration_seconds";
    /// Counter: feed fetch retries.
    pub const FEED_RETRIES_TOTAL: &str = "ladle_extractor_feed_retries_total";
}

/// Label keys used across metrics.
pub mod labels {
    /// Chunk outcome (written, fetch_skipped, write_skipped).
    pub const RESULT: &str = "result";
    /// Row disposition (extracted, dropped).
    pub const DISPOSITION: &str = "disposition";
}

/// Chunk outcome label values.
pub mod outcomes {
    /// The chunk was durably written.
    pub const WRITTEN: &str = "written";
    /// The fetch was skipped by the API fault gate.
    pub const FETCH_SKIPPED: &str = "fetch_skipped";
    /// The blob write was skipped by the storage fault gate.
    pub const WRITE_SKIPPED: &str = "write_skipped";
}

/// Extractor metrics facade.
#[derive(Debug, Clone, Copy)]
pub struct ExtractorMetrics;

impl ExtractorMetrics {
    /// Records one attempted chunk by outcome.
    pub fn record_chunk(result: &'static str) {
        counter!(names::CHUNKS_TOTAL, labels::RESULT => result).increment(1);
    }

    /// Records row dispositions for one chunk.
    pub fn record_rows(extracted: u64, dropped: u64) {
        counter!(names::ROWS_TOTAL, labels::DISPOSITION => "extracted").increment(extracted);
        counter!(names::ROWS_TOTAL, labels::DISPOSITION => "dropped").increment(dropped);
    }

    /// Records the wall-clock duration of a completed run.
    pub fn observe_run_duration(seconds: f64) {
        histogram!(names::RUN_DURATION_SECONDS).record(seconds);
    }

    /// Records one feed fetch retry.
    pub fn record_feed_retry() {
        counter!(names::FEED_RETRIES_TOTAL).increment(1);
    }
}
