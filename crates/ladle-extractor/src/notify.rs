//! Lifecycle notifications to the trigger.
//!
//! Sends are best-effort by contract: a failed completion POST never rolls
//! back chunks, and the manifest — not the event — is the authoritative
//! durable signal. Callers log notification errors and move on.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use ladle_core::PipelineEvent;

use crate::error::{Error, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts lifecycle events to the trigger's event ingress.
#[async_trait]
pub trait TriggerNotifier: Send + Sync + 'static {
    /// Posts one event.
    async fn post(&self, event: &PipelineEvent) -> Result<()>;
}

/// HTTP notifier posting JSON events to a fixed ingress URL.
pub struct HttpNotifier {
    client: reqwest::Client,
    url: String,
}

impl std::fmt::Debug for HttpNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpNotifier").field("url", &self.url).finish()
    }
}

impl HttpNotifier {
    /// Creates a notifier for the given ingress URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::Notify(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl TriggerNotifier for HttpNotifier {
    async fn post(&self, event: &PipelineEvent) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(event)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| Error::Notify(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Notify(format!("trigger returned {status}")));
        }
        Ok(())
    }
}

/// Notifier used when no trigger URL is configured (debug mode).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

#[async_trait]
impl TriggerNotifier for NullNotifier {
    async fn post(&self, event: &PipelineEvent) -> Result<()> {
        tracing::debug!(event = %event.event, date = %event.date, "no trigger configured, dropping event");
        Ok(())
    }
}

/// Notifier that records events in memory, for tests.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingNotifier {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the posted events.
    ///
    /// # Panics
    ///
    /// Panics if the interior lock is poisoned.
    #[must_use]
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().expect("notifier lock poisoned").clone()
    }
}

#[async_trait]
impl TriggerNotifier for RecordingNotifier {
    async fn post(&self, event: &PipelineEvent) -> Result<()> {
        self.events
            .lock()
            .map_err(|_| Error::Notify("notifier lock poisoned".into()))?
            .push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ladle_core::EventKind;

    #[tokio::test]
    async fn recording_notifier_captures_events() {
        let notifier = RecordingNotifier::new();
        let event = PipelineEvent::new(EventKind::ExtractorStarted, "extractor", "2025-03-30");

        notifier.post(&event).await.expect("post should succeed");

        let events = notifier.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, EventKind::ExtractorStarted);
    }

    #[tokio::test]
    async fn null_notifier_accepts_everything() {
        let notifier = NullNotifier;
        let event = PipelineEvent::new(EventKind::ExtractorCompleted, "extractor", "2025-03-30")
            .with_duration(1.0);
        notifier.post(&event).await.expect("post should succeed");
    }
}
