//! The extraction run: a resumable, chunked fetch loop with fault gates.
//!
//! Chunks are processed strictly sequentially by ascending offset — the
//! checkpoint is a scalar, so out-of-order progress has nowhere to go.
//! Only durable success moves the checkpoint: the simulated-API and
//! simulated-storage gates advance the loop offset but leave the
//! checkpoint where it was, so the next run retries the same offset.
//!
//! Termination falls in two classes:
//!
//! - **Normal** (feed exhausted, `max_offset` reached, shutdown requested):
//!   the stage manifest is written with `upload_complete: true` and the
//!   completion event is posted.
//! - **Aborted** (feed down through the retry ladder, unparsable body,
//!   storage write failure): the run returns an error and no manifest is
//!   written. Absence of the manifest is the crash signal downstream.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use chrono::{NaiveDate, Utc};
use tracing::Instrument;

use ladle_core::observability::extraction_span;
use ladle_core::{
    ChunkMetric, ChunkMetricsSink, CheckpointStore, EventKind, FaultGates, ManifestStore,
    PipelineEvent, RunRequest, StageManifest, StagePaths, StorageBackend,
};

use crate::error::{Error, Result};
use crate::feed::{RetryPolicy, SourceFeed, fetch_with_retry};
use crate::metrics::{ExtractorMetrics, outcomes};
use crate::notify::TriggerNotifier;

/// Records fetched per page. Fixed by design; `max_offset` is the run-time
/// knob, not the page size.
pub const CHUNK_SIZE: u64 = 1000;

/// Bodies shorter than this are treated as feed exhaustion without
/// parsing. Catches empty arrays and whitespace-only responses.
const EXHAUSTION_SENTINEL_BYTES: usize = 100;

/// Origin string stamped on lifecycle events.
const ORIGIN: &str = "extractor";

/// Summary of one extraction run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// The date that was extracted.
    pub date: NaiveDate,
    /// Basenames of chunks written this run, as listed in the manifest.
    pub files: Vec<String>,
    /// Rows retained across all written and write-skipped chunks.
    pub rows_extracted: u64,
    /// Rows discarded by the row-drop gate.
    pub rows_dropped: u64,
    /// Chunks durably written.
    pub chunks_written: u64,
    /// Chunks skipped by a fault gate.
    pub chunks_skipped: u64,
    /// Wall-clock seconds for the whole run.
    pub duration_seconds: f64,
    /// Loop offset at termination.
    pub final_offset: u64,
}

struct LoopTotals {
    files: Vec<String>,
    rows_extracted: u64,
    rows_dropped: u64,
    chunks_written: u64,
    chunks_skipped: u64,
    offset: u64,
}

/// The extractor: owns the storage, feed, telemetry, and notification
/// seams and runs the chunk loop.
pub struct Extractor {
    storage: Arc<dyn StorageBackend>,
    feed: Arc<dyn SourceFeed>,
    sink: Arc<dyn ChunkMetricsSink>,
    notifier: Arc<dyn TriggerNotifier>,
    paths: StagePaths,
    manifests: ManifestStore,
    checkpoint: CheckpointStore,
    retry: RetryPolicy,
    pause: Duration,
    shutdown: AtomicBool,
    active: AtomicBool,
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("paths", &self.paths)
            .field("retry", &self.retry)
            .field("pause", &self.pause)
            .field("shutdown", &self.shutdown)
            .finish_non_exhaustive()
    }
}

impl Extractor {
    /// Creates an extractor over the given seams, rooted at the
    /// `raw-data` prefix.
    #[must_use]
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        feed: Arc<dyn SourceFeed>,
        sink: Arc<dyn ChunkMetricsSink>,
        notifier: Arc<dyn TriggerNotifier>,
    ) -> Self {
        let paths = StagePaths::raw_data();
        Self {
            manifests: ManifestStore::new(Arc::clone(&storage), paths.clone()),
            checkpoint: CheckpointStore::new(Arc::clone(&storage)),
            storage,
            feed,
            sink,
            notifier,
            paths,
            retry: RetryPolicy::default(),
            pause: Duration::from_secs(2),
            shutdown: AtomicBool::new(false),
            active: AtomicBool::new(false),
        }
    }

    /// Overrides the feed retry schedule.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Overrides the injected-delay duration (tests shorten it).
    #[must_use]
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Requests a cooperative shutdown; the current run exits after its
    /// in-flight chunk.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Returns true once a shutdown has been requested.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Runs an extraction with fault gates seeded from OS entropy.
    ///
    /// # Errors
    ///
    /// Returns an error when the run aborts (feed down, unparsable body,
    /// storage write failure, invalid date). No manifest is written on
    /// abort.
    pub async fn run(&self, request: RunRequest) -> Result<RunOutcome> {
        let gates = FaultGates::new(request.fault_plan());
        self.run_with_gates(request, gates).await
    }

    /// Runs an extraction with caller-supplied gates (deterministic tests).
    ///
    /// # Errors
    ///
    /// See [`Extractor::run`].
    pub async fn run_with_gates(
        &self,
        request: RunRequest,
        mut gates: FaultGates,
    ) -> Result<RunOutcome> {
        let date = resolve_date(&request.date)?;

        // Concurrent runs share one checkpoint; same-date overlap is
        // undefined behavior, so at least make it visible.
        if self.active.swap(true, Ordering::SeqCst) {
            tracing::warn!(date = %date, "another extraction is already in flight");
        }
        let result = self.run_inner(date, &request, &mut gates).await;
        self.active.store(false, Ordering::SeqCst);
        result
    }

    async fn run_inner(
        &self,
        date: NaiveDate,
        request: &RunRequest,
        gates: &mut FaultGates,
    ) -> Result<RunOutcome> {
        self.notify(PipelineEvent::new(
            EventKind::ExtractorStarted,
            ORIGIN,
            date.to_string(),
        ))
        .await;

        let started = Instant::now();
        let offset0 = self.checkpoint.read().await?;

        tracing::info!(
            date = %date,
            start_offset = offset0,
            max_offset = request.max_offset,
            "extraction run starting"
        );

        let totals = self
            .chunk_loop(date, offset0, request.max_offset, gates)
            .instrument(extraction_span(&date.to_string(), offset0))
            .await?;

        let manifest = StageManifest::completed(date, totals.files.clone());
        self.manifests.write(&manifest).await?;
        tracing::info!(
            date = %date,
            files = manifest.files.len(),
            "manifest written"
        );

        let duration_seconds = started.elapsed().as_secs_f64();
        ExtractorMetrics::observe_run_duration(duration_seconds);

        self.notify(
            PipelineEvent::new(EventKind::ExtractorCompleted, ORIGIN, date.to_string())
                .with_duration(duration_seconds),
        )
        .await;

        Ok(RunOutcome {
            date,
            files: totals.files,
            rows_extracted: totals.rows_extracted,
            rows_dropped: totals.rows_dropped,
            chunks_written: totals.chunks_written,
            chunks_skipped: totals.chunks_skipped,
            duration_seconds,
            final_offset: totals.offset,
        })
    }

    async fn chunk_loop(
        &self,
        date: NaiveDate,
        offset0: u64,
        max_offset: u64,
        gates: &mut FaultGates,
    ) -> Result<LoopTotals> {
        let mut totals = LoopTotals {
            files: Vec::new(),
            rows_extracted: 0,
            rows_dropped: 0,
            chunks_written: 0,
            chunks_skipped: 0,
            offset: offset0,
        };

        loop {
            if self.is_shutting_down() {
                tracing::info!(offset = totals.offset, "shutdown requested, ending run");
                break;
            }
            if max_offset > 0 && totals.offset >= offset0 + max_offset {
                tracing::info!(offset = totals.offset, "reached max_offset, ending run");
                break;
            }

            if gates.api_fails() {
                tracing::warn!(offset = totals.offset, "api fault gate fired, skipping fetch");
                self.record(date, ChunkMetric::fetch_skipped(totals.offset))
                    .await;
                ExtractorMetrics::record_chunk(outcomes::FETCH_SKIPPED);
                totals.chunks_skipped += 1;
                totals.offset += CHUNK_SIZE;
                continue;
            }

            let chunk_started = Instant::now();
            let body =
                fetch_with_retry(self.feed.as_ref(), &self.retry, CHUNK_SIZE, totals.offset)
                    .await?;

            if body.len() < EXHAUSTION_SENTINEL_BYTES {
                tracing::info!(offset = totals.offset, "feed exhausted, ending run");
                break;
            }

            let records: Vec<serde_json::Value> =
                serde_json::from_slice(&body).map_err(|e| Error::Parse {
                    offset: totals.offset,
                    message: e.to_string(),
                })?;
            if records.is_empty() {
                tracing::info!(offset = totals.offset, "feed returned empty page, ending run");
                break;
            }

            let mut dropped = 0u64;
            let mut ndjson = Vec::with_capacity(body.len());
            for record in &records {
                if gates.drop_row() {
                    dropped += 1;
                    continue;
                }
                serde_json::to_writer(&mut ndjson, record).map_err(|e| Error::Parse {
                    offset: totals.offset,
                    message: e.to_string(),
                })?;
                ndjson.push(b'\n');
            }
            let retained = records.len() as u64 - dropped;

            if gates.gcs_fails() {
                tracing::warn!(
                    offset = totals.offset,
                    "storage fault gate fired, skipping write"
                );
                self.record(
                    date,
                    ChunkMetric::write_skipped(
                        totals.offset,
                        retained,
                        dropped,
                        chunk_started.elapsed().as_secs_f64(),
                    ),
                )
                .await;
                ExtractorMetrics::record_chunk(outcomes::WRITE_SKIPPED);
                totals.chunks_skipped += 1;
                totals.offset += CHUNK_SIZE;
                continue;
            }

            let mut delay_applied = false;
            if gates.delay_hit() {
                tracing::info!(offset = totals.offset, "delay gate fired");
                delay_applied = true;
                tokio::time::sleep(self.pause).await;
            }

            self.storage
                .put(&self.paths.chunk(date, totals.offset), Bytes::from(ndjson))
                .await?;

            totals.files.push(StagePaths::chunk_filename(totals.offset));
            totals.rows_extracted += retained;
            totals.rows_dropped += dropped;
            totals.chunks_written += 1;

            self.record(
                date,
                ChunkMetric::written(
                    totals.offset,
                    retained,
                    dropped,
                    chunk_started.elapsed().as_secs_f64(),
                    delay_applied,
                ),
            )
            .await;
            ExtractorMetrics::record_chunk(outcomes::WRITTEN);
            ExtractorMetrics::record_rows(retained, dropped);

            totals.offset += CHUNK_SIZE;
            if let Err(e) = self.checkpoint.write(totals.offset).await {
                // The next run refetches from the last durable offset.
                tracing::warn!(error = %e, offset = totals.offset, "failed to persist checkpoint");
            }
        }

        Ok(totals)
    }

    /// Telemetry is best-effort: log and continue, never fail the run.
    async fn record(&self, date: NaiveDate, metric: ChunkMetric) {
        if let Err(e) = self.sink.record(date, &metric).await {
            tracing::warn!(error = %e, offset = metric.offset, "failed to record chunk metric");
        }
    }

    /// Lifecycle sends are best-effort; the manifest is the durable signal.
    async fn notify(&self, event: PipelineEvent) {
        let kind = event.event;
        if let Err(e) = self.notifier.post(&event).await {
            tracing::warn!(error = %e, event = %kind, "failed to notify trigger");
        }
    }
}

fn resolve_date(date: &str) -> Result<NaiveDate> {
    if date.trim().is_empty() {
        return Ok(Utc::now().date_naive());
    }
    date.trim()
        .parse()
        .map_err(|e| Error::Config(format!("invalid date {date:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_date_resolves_to_today() {
        let resolved = resolve_date("").expect("should resolve");
        assert_eq!(resolved, Utc::now().date_naive());
    }

    #[test]
    fn explicit_date_is_parsed() {
        let resolved = resolve_date("2025-03-30").expect("should resolve");
        assert_eq!(resolved.to_string(), "2025-03-30");
    }

    #[test]
    fn malformed_date_is_rejected() {
        assert!(resolve_date("03/30/2025").is_err());
        assert!(resolve_date("2025-13-99").is_err());
    }
}
