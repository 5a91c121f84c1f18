//! Per-chunk telemetry rows.
//!
//! Every chunk the extractor *attempts* — including chunks skipped by an
//! injected fault — produces exactly one [`ChunkMetric`] row. The flag
//! fields distinguish real work from skips, which is what lets the
//! monitoring side reconcile `rows_extracted + rows_dropped` against what
//! actually landed in the bucket.
//!
//! Sinks are best-effort by contract: a failed telemetry write is logged
//! by the caller and never fails the run.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::paths::telemetry_row;
use crate::storage::StorageBackend;

/// One row per attempted chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetric {
    /// Starting offset of the chunk.
    pub offset: u64,
    /// Records retained after the row-drop gate.
    pub rows_extracted: u64,
    /// Records discarded by the row-drop gate.
    pub rows_dropped: u64,
    /// Wall-clock seconds spent on this chunk.
    pub chunk_duration_seconds: f64,
    /// True when the injected delay gate fired.
    pub delay_applied: bool,
    /// True when the simulated API failure skipped the fetch.
    pub fetch_skipped: bool,
    /// True when the simulated storage failure skipped the write.
    pub gcs_write_skipped: bool,
    /// When the row was recorded.
    pub timestamp: DateTime<Utc>,
}

impl ChunkMetric {
    /// Row for a chunk whose fetch was skipped by the API fault gate.
    #[must_use]
    pub fn fetch_skipped(offset: u64) -> Self {
        Self {
            offset,
            rows_extracted: 0,
            rows_dropped: 0,
            chunk_duration_seconds: 0.0,
            delay_applied: false,
            fetch_skipped: true,
            gcs_write_skipped: false,
            timestamp: Utc::now(),
        }
    }

    /// Row for a chunk whose blob write was skipped by the storage fault
    /// gate. Rows were fetched and counted but nothing was persisted.
    #[must_use]
    pub fn write_skipped(
        offset: u64,
        rows_extracted: u64,
        rows_dropped: u64,
        chunk_duration_seconds: f64,
    ) -> Self {
        Self {
            offset,
            rows_extracted,
            rows_dropped,
            chunk_duration_seconds,
            delay_applied: false,
            fetch_skipped: false,
            gcs_write_skipped: true,
            timestamp: Utc::now(),
        }
    }

    /// Row for a durably written chunk.
    #[must_use]
    pub fn written(
        offset: u64,
        rows_extracted: u64,
        rows_dropped: u64,
        chunk_duration_seconds: f64,
        delay_applied: bool,
    ) -> Self {
        Self {
            offset,
            rows_extracted,
            rows_dropped,
            chunk_duration_seconds,
            delay_applied,
            fetch_skipped: false,
            gcs_write_skipped: false,
            timestamp: Utc::now(),
        }
    }
}

/// Append-only sink for chunk telemetry rows.
#[async_trait]
pub trait ChunkMetricsSink: Send + Sync + 'static {
    /// Records one row for an attempted chunk.
    async fn record(&self, date: NaiveDate, metric: &ChunkMetric) -> Result<()>;
}

/// In-memory sink for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    rows: Mutex<Vec<(NaiveDate, ChunkMetric)>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the recorded rows.
    ///
    /// # Panics
    ///
    /// Panics if the interior lock is poisoned.
    #[must_use]
    pub fn rows(&self) -> Vec<(NaiveDate, ChunkMetric)> {
        self.rows.lock().expect("sink lock poisoned").clone()
    }
}

#[async_trait]
impl ChunkMetricsSink for MemorySink {
    async fn record(&self, date: NaiveDate, metric: &ChunkMetric) -> Result<()> {
        self.rows
            .lock()
            .map_err(|_| Error::Internal {
                message: "sink lock poisoned".into(),
            })?
            .push((date, metric.clone()));
        Ok(())
    }
}

/// Sink that lands each row as its own object under `telemetry/{date}/`.
///
/// One object per attempted chunk keeps the sink append-only and makes a
/// retried chunk's row overwrite its earlier attempt instead of
/// double-counting.
#[derive(Clone)]
pub struct StorageSink {
    storage: Arc<dyn StorageBackend>,
}

impl std::fmt::Debug for StorageSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageSink")
            .field("storage", &"<StorageBackend>")
            .finish()
    }
}

impl StorageSink {
    /// Creates a sink over the given storage backend.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl ChunkMetricsSink for StorageSink {
    async fn record(&self, date: NaiveDate, metric: &ChunkMetric) -> Result<()> {
        let body = serde_json::to_vec(metric).map_err(Error::serialization)?;
        self.storage
            .put(&telemetry_row(date, metric.offset), Bytes::from(body))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 30).expect("valid date")
    }

    #[tokio::test]
    async fn memory_sink_records_rows_in_order() {
        let sink = MemorySink::new();
        sink.record(date(), &ChunkMetric::fetch_skipped(0))
            .await
            .expect("record should succeed");
        sink.record(date(), &ChunkMetric::written(1000, 990, 10, 0.8, false))
            .await
            .expect("record should succeed");

        let rows = sink.rows();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].1.fetch_skipped);
        assert_eq!(rows[1].1.rows_extracted, 990);
    }

    #[tokio::test]
    async fn storage_sink_lands_one_object_per_chunk() {
        let storage = Arc::new(MemoryBackend::new());
        let sink = StorageSink::new(Arc::clone(&storage) as Arc<dyn StorageBackend>);

        sink.record(date(), &ChunkMetric::written(2000, 1000, 0, 1.2, true))
            .await
            .expect("record should succeed");

        let body = storage
            .get("telemetry/2025-03-30/offset_2000.json")
            .await
            .expect("row object should exist");
        let row: ChunkMetric = serde_json::from_slice(&body).expect("parse");
        assert_eq!(row.rows_extracted, 1000);
        assert!(row.delay_applied);
    }

    #[test]
    fn skip_constructors_set_exactly_one_flag() {
        let fetch = ChunkMetric::fetch_skipped(0);
        assert!(fetch.fetch_skipped && !fetch.gcs_write_skipped);
        assert_eq!(fetch.rows_extracted, 0);

        let write = ChunkMetric::write_skipped(1000, 900, 100, 0.5);
        assert!(write.gcs_write_skipped && !write.fetch_skipped);
        assert_eq!(write.rows_dropped, 100);
    }
}
