//! Pipeline lifecycle events.
//!
//! Every stage posts a [`PipelineEvent`] to the Trigger's event ingress
//! when it starts or finishes a date. The Trigger routes recognized events
//! to the next stage and deduplicates on the `(date, event)` pair, so the
//! event name doubles as the dedup key — it must be stable and closed over
//! the known set of stages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The closed set of recognized pipeline events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// The extractor has begun a run (informational).
    ExtractorStarted,
    /// The extractor has written its manifest for a date.
    ExtractorCompleted,
    /// The cleaner has written its manifest for a date.
    CleanerCompleted,
    /// The JSON loader has finished a date (optional branch).
    LoaderJsonCompleted,
    /// The Parquet loader has finished a date (pipeline terminal).
    LoaderParquetCompleted,
}

impl EventKind {
    /// Returns the wire name (`snake_case`) of this event.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ExtractorStarted => "extractor_started",
            Self::ExtractorCompleted => "extractor_completed",
            Self::CleanerCompleted => "cleaner_completed",
            Self::LoaderJsonCompleted => "loader_json_completed",
            Self::LoaderParquetCompleted => "loader_parquet_completed",
        }
    }

    /// Parses a wire name into an event kind.
    ///
    /// Returns `None` for unrecognized names; the Trigger logs and drops
    /// those rather than failing the request.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "extractor_started" => Some(Self::ExtractorStarted),
            "extractor_completed" => Some(Self::ExtractorCompleted),
            "cleaner_completed" => Some(Self::CleanerCompleted),
            "loader_json_completed" => Some(Self::LoaderJsonCompleted),
            "loader_parquet_completed" => Some(Self::LoaderParquetCompleted),
            _ => None,
        }
    }

    /// Returns true for the terminal event of a pipeline run.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::LoaderParquetCompleted)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The message any stage posts to the Trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// Which lifecycle transition happened.
    pub event: EventKind,
    /// The stage that emitted the event (e.g. `extractor`).
    pub origin: String,
    /// The calendar day the event refers to (`YYYY-MM-DD`).
    pub date: String,
    /// When the event was emitted.
    pub timestamp: DateTime<Utc>,
    /// Wall-clock seconds the stage spent on this date, when measured.
    ///
    /// Always a JSON number — stages must never stringify durations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl PipelineEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(event: EventKind, origin: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            event,
            origin: origin.into(),
            date: date.into(),
            timestamp: Utc::now(),
            duration: None,
        }
    }

    /// Attaches a measured duration in seconds.
    #[must_use]
    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    /// Returns the `(date, event)` dedup key the Trigger caches on.
    #[must_use]
    pub fn dedup_key(&self) -> (String, EventKind) {
        (self.date.clone(), self.event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names_roundtrip() {
        for kind in [
            EventKind::ExtractorStarted,
            EventKind::ExtractorCompleted,
            EventKind::CleanerCompleted,
            EventKind::LoaderJsonCompleted,
            EventKind::LoaderParquetCompleted,
        ] {
            assert_eq!(EventKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(EventKind::from_name("warehouse_exploded"), None);
    }

    #[test]
    fn event_serializes_snake_case_with_numeric_duration() {
        let event = PipelineEvent::new(EventKind::ExtractorCompleted, "extractor", "2025-03-30")
            .with_duration(12.5);
        let json = serde_json::to_value(&event).expect("serialize");

        assert_eq!(json["event"], "extractor_completed");
        assert_eq!(json["origin"], "extractor");
        assert_eq!(json["date"], "2025-03-30");
        assert!(json["duration"].is_f64(), "duration must be a number");
    }

    #[test]
    fn duration_is_omitted_when_absent() {
        let event = PipelineEvent::new(EventKind::ExtractorStarted, "extractor", "2025-03-30");
        let json = serde_json::to_value(&event).expect("serialize");
        assert!(json.get("duration").is_none());
    }

    #[test]
    fn terminal_event_is_loader_parquet() {
        assert!(EventKind::LoaderParquetCompleted.is_terminal());
        assert!(!EventKind::CleanerCompleted.is_terminal());
    }
}
