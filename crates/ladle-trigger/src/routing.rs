//! Event routing: the pipeline DAG as a table.
//!
//! Per-date flow (JSON-loader branch disabled, the default):
//!
//! ```text
//! extractor_started ──▶ (noted)
//! extractor_completed ──▶ cleaner
//! cleaner_completed ──▶ loader-parquet
//! loader_parquet_completed ──▶ terminal
//! ```
//!
//! With the branch enabled, `cleaner_completed` routes to the JSON loader
//! and `loader_json_completed` routes on to the Parquet loader.
//!
//! Out-of-order events are not reordered: each either hits the dedup
//! cache or is forwarded as-is. Unknown events are logged and dropped
//! with a `200` — a misbehaving worker must not wedge the ingress.

use std::sync::Arc;

use serde::Deserialize;

use ladle_core::{EventKind, RunRequest};

use crate::cache::CompletionCache;
use crate::dispatch::{Stage, WorkerDispatcher};
use crate::durations::DurationLog;
use crate::error::Result;
use crate::metrics::TriggerMetrics;

/// An event as it arrives on the ingress.
///
/// Lenient by design: every field defaults, and `event` stays a string
/// until it is matched against the known set.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingEvent {
    /// Wire name of the event.
    #[serde(default)]
    pub event: String,
    /// The stage that emitted the event.
    #[serde(default)]
    pub origin: String,
    /// The calendar day the event refers to.
    #[serde(default)]
    pub date: String,
    /// Stage duration in seconds, when measured. Numbers only.
    #[serde(default)]
    pub duration: Option<f64>,
}

/// What the routing table says to do with a recognized event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAction {
    /// Informational; record and do nothing.
    Ignore,
    /// Invoke the given stage with `{date}`.
    Forward(Stage),
    /// The pipeline is done for this date.
    Terminal,
}

/// Resolves the next hop for a recognized event.
#[must_use]
pub fn route(event: EventKind, json_loader_enabled: bool) -> RouteAction {
    match event {
        EventKind::ExtractorStarted => RouteAction::Ignore,
        EventKind::ExtractorCompleted => RouteAction::Forward(Stage::Cleaner),
        EventKind::CleanerCompleted if json_loader_enabled => {
            RouteAction::Forward(Stage::LoaderJson)
        }
        EventKind::CleanerCompleted => RouteAction::Forward(Stage::LoaderParquet),
        EventKind::LoaderJsonCompleted if json_loader_enabled => {
            RouteAction::Forward(Stage::LoaderParquet)
        }
        // Branch disabled: a stray JSON-loader completion routes nowhere.
        EventKind::LoaderJsonCompleted => RouteAction::Ignore,
        EventKind::LoaderParquetCompleted => RouteAction::Terminal,
    }
}

/// Outcome of handling one ingress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Recognized, informational, nothing forwarded.
    Noted,
    /// `(date, event)` was already routed; nothing forwarded.
    Duplicate,
    /// Unrecognized event name; logged and dropped.
    Unknown,
    /// Forwarded to the given stage.
    Forwarded(Stage),
    /// Forwarding failed at the transport level; logged, no retry.
    ForwardFailed(Stage),
    /// Terminal event; the pipeline is complete for the date.
    Terminal,
}

impl Disposition {
    /// Returns the response body text for this outcome.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Noted => "event noted".to_string(),
            Self::Duplicate => "duplicate event ignored".to_string(),
            Self::Unknown => "unknown event ignored".to_string(),
            Self::Forwarded(stage) => format!("forwarded to {stage}"),
            Self::ForwardFailed(stage) => format!("forward to {stage} failed, see logs"),
            Self::Terminal => "pipeline completed".to_string(),
        }
    }

    fn metric_label(self) -> &'static str {
        match self {
            Self::Noted => "noted",
            Self::Duplicate => "duplicate",
            Self::Unknown => "unknown",
            Self::Forwarded(_) => "forwarded",
            Self::ForwardFailed(_) => "forward_failed",
            Self::Terminal => "terminal",
        }
    }
}

/// Routes ingress events through dedup, duration logging, and dispatch.
pub struct Router {
    cache: CompletionCache,
    dispatcher: Arc<dyn WorkerDispatcher>,
    durations: DurationLog,
    json_loader_enabled: bool,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("dispatcher", &"<WorkerDispatcher>")
            .field("json_loader_enabled", &self.json_loader_enabled)
            .finish_non_exhaustive()
    }
}

impl Router {
    /// Creates a router over the given dispatcher.
    #[must_use]
    pub fn new(
        dispatcher: Arc<dyn WorkerDispatcher>,
        durations: DurationLog,
        json_loader_enabled: bool,
    ) -> Self {
        Self {
            cache: CompletionCache::new(),
            dispatcher,
            durations,
            json_loader_enabled,
        }
    }

    /// Forwards a run request to the extractor, verbatim.
    ///
    /// # Errors
    ///
    /// Returns an error when the forward fails at the transport level;
    /// the HTTP surface maps this to `502`.
    pub async fn start_run(&self, request: &RunRequest) -> Result<()> {
        tracing::info!(
            date = %request.date,
            max_offset = request.max_offset,
            api_error_prob = request.api_error_prob,
            gcs_error_prob = request.gcs_error_prob,
            row_drop_prob = request.row_drop_prob,
            delay_prob = request.delay_prob,
            "pipeline run requested"
        );

        match self.dispatcher.start_run(request).await {
            Ok(()) => {
                TriggerMetrics::record_dispatch(Stage::Extractor.label(), "success");
                Ok(())
            }
            Err(e) => {
                TriggerMetrics::record_dispatch(Stage::Extractor.label(), "failure");
                Err(e)
            }
        }
    }

    /// Handles one ingress event.
    ///
    /// Always resolves to a disposition; transport failures downstream are
    /// logged, not surfaced, because the poster has already done its part.
    pub async fn handle(&self, incoming: &IncomingEvent) -> Disposition {
        let disposition = self.handle_inner(incoming).await;
        TriggerMetrics::record_event(incoming.event.clone(), disposition.metric_label());
        disposition
    }

    async fn handle_inner(&self, incoming: &IncomingEvent) -> Disposition {
        tracing::info!(
            event = %incoming.event,
            origin = %incoming.origin,
            date = %incoming.date,
            "event received"
        );

        let Some(kind) = EventKind::from_name(&incoming.event) else {
            tracing::warn!(event = %incoming.event, "unknown event, dropping");
            return Disposition::Unknown;
        };

        if !self.cache.insert(&incoming.date, kind) {
            tracing::warn!(event = %kind, date = %incoming.date, "duplicate event, ignoring");
            return Disposition::Duplicate;
        }

        if let Some(duration) = incoming.duration {
            match self
                .durations
                .append(&incoming.origin, &incoming.date, kind.name(), duration)
            {
                Ok(()) => {
                    tracing::info!(origin = %incoming.origin, duration, "stage duration logged");
                }
                Err(e) => tracing::warn!(error = %e, "failed to append duration log"),
            }
        }

        match route(kind, self.json_loader_enabled) {
            RouteAction::Ignore => Disposition::Noted,
            RouteAction::Forward(stage) => {
                match self.dispatcher.invoke(stage, &incoming.date).await {
                    Ok(()) => {
                        TriggerMetrics::record_dispatch(stage.label(), "success");
                        Disposition::Forwarded(stage)
                    }
                    Err(e) => {
                        tracing::error!(error = %e, stage = %stage, "worker forward failed");
                        TriggerMetrics::record_dispatch(stage.label(), "failure");
                        Disposition::ForwardFailed(stage)
                    }
                }
            }
            RouteAction::Terminal => {
                tracing::info!(date = %incoming.date, "pipeline completed for date");
                Disposition::Terminal
            }
        }
    }

    /// Empties the completion cache.
    pub fn purge(&self) {
        self.cache.purge();
        tracing::info!("completion cache purged");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::RecordingDispatcher;

    fn incoming(event: &str, date: &str) -> IncomingEvent {
        IncomingEvent {
            event: event.to_string(),
            origin: "test".to_string(),
            date: date.to_string(),
            duration: None,
        }
    }

    fn temp_durations() -> DurationLog {
        DurationLog::new(std::env::temp_dir().join("ladle-router-tests"))
    }

    fn router(dispatcher: Arc<RecordingDispatcher>, json_loader: bool) -> Router {
        Router::new(dispatcher, temp_durations(), json_loader)
    }

    #[test]
    fn routing_table_matches_pipeline_dag() {
        assert_eq!(route(EventKind::ExtractorStarted, false), RouteAction::Ignore);
        assert_eq!(
            route(EventKind::ExtractorCompleted, false),
            RouteAction::Forward(Stage::Cleaner)
        );
        assert_eq!(
            route(EventKind::CleanerCompleted, false),
            RouteAction::Forward(Stage::LoaderParquet)
        );
        assert_eq!(
            route(EventKind::LoaderParquetCompleted, false),
            RouteAction::Terminal
        );
    }

    #[test]
    fn json_loader_branch_adds_one_hop() {
        assert_eq!(
            route(EventKind::CleanerCompleted, true),
            RouteAction::Forward(Stage::LoaderJson)
        );
        assert_eq!(
            route(EventKind::LoaderJsonCompleted, true),
            RouteAction::Forward(Stage::LoaderParquet)
        );
        // Branch disabled: the JSON loader's completion routes nowhere.
        assert_eq!(
            route(EventKind::LoaderJsonCompleted, false),
            RouteAction::Ignore
        );
    }

    #[tokio::test]
    async fn completion_event_forwards_once() {
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let router = router(Arc::clone(&dispatcher), false);

        let first = router
            .handle(&incoming("cleaner_completed", "2025-03-30"))
            .await;
        assert_eq!(first, Disposition::Forwarded(Stage::LoaderParquet));

        let second = router
            .handle(&incoming("cleaner_completed", "2025-03-30"))
            .await;
        assert_eq!(second, Disposition::Duplicate);

        assert_eq!(dispatcher.invocations().len(), 1);
    }

    #[tokio::test]
    async fn unknown_events_are_dropped_before_dedup() {
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let router = router(Arc::clone(&dispatcher), false);

        let disposition = router.handle(&incoming("warehouse_exploded", "2025-03-30")).await;
        assert_eq!(disposition, Disposition::Unknown);
        assert!(dispatcher.invocations().is_empty());
    }

    #[tokio::test]
    async fn forward_failure_is_logged_not_retried() {
        let dispatcher = Arc::new(RecordingDispatcher::failing());
        let router = router(Arc::clone(&dispatcher), false);

        let disposition = router
            .handle(&incoming("extractor_completed", "2025-03-30"))
            .await;
        assert_eq!(disposition, Disposition::ForwardFailed(Stage::Cleaner));

        // The (date, event) pair is cached even though the forward failed;
        // recovery is /purge plus a manual re-trigger.
        let retry = router
            .handle(&incoming("extractor_completed", "2025-03-30"))
            .await;
        assert_eq!(retry, Disposition::Duplicate);
    }

    #[tokio::test]
    async fn purge_allows_a_date_to_be_redriven() {
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let router = router(Arc::clone(&dispatcher), false);

        router
            .handle(&incoming("cleaner_completed", "2025-03-30"))
            .await;
        router.purge();
        let redriven = router
            .handle(&incoming("cleaner_completed", "2025-03-30"))
            .await;

        assert_eq!(redriven, Disposition::Forwarded(Stage::LoaderParquet));
        assert_eq!(dispatcher.invocations().len(), 2);
    }
}
