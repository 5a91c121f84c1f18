//! Worker dispatch abstraction.
//!
//! The trigger holds no references to other components; coupling is by
//! URL configuration injected at startup. Forwards are fire-and-log with
//! a bounded timeout — no distributed cancellation, no automatic retry.
//! The `/purge` control plus a manual re-trigger is the recovery path.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use ladle_core::RunRequest;

use crate::config::ServiceUrls;
use crate::error::{Error, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The downstream stages the trigger can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// The extractor (invoked from `/run` with a full request).
    Extractor,
    /// The cleaning transform.
    Cleaner,
    /// The JSON loader (optional branch).
    LoaderJson,
    /// The Parquet loader.
    LoaderParquet,
}

impl Stage {
    /// Returns the stage's log label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Extractor => "extractor",
            Self::Cleaner => "cleaner",
            Self::LoaderJson => "loader-json",
            Self::LoaderParquet => "loader-parquet",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Serialize)]
struct StageInvocation<'a> {
    date: &'a str,
}

/// Dispatches work to stage workers.
#[async_trait]
pub trait WorkerDispatcher: Send + Sync + 'static {
    /// Forwards a full run request to the extractor.
    async fn start_run(&self, request: &RunRequest) -> Result<()>;

    /// Invokes a stage worker with `{date}`.
    async fn invoke(&self, stage: Stage, date: &str) -> Result<()>;
}

/// HTTP dispatcher POSTing JSON to configured worker URLs.
pub struct HttpDispatcher {
    client: reqwest::Client,
    urls: ServiceUrls,
}

impl std::fmt::Debug for HttpDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDispatcher")
            .field("urls", &self.urls)
            .finish()
    }
}

impl HttpDispatcher {
    /// Creates a dispatcher over the configured worker URLs.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(urls: ServiceUrls) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, urls })
    }

    fn url_for(&self, stage: Stage) -> Result<&str> {
        let url = match stage {
            Stage::Extractor => &self.urls.extractor.url,
            Stage::Cleaner => &self.urls.cleaner.url,
            Stage::LoaderJson => &self.urls.loader.url,
            Stage::LoaderParquet => &self.urls.loader_parquet.url,
        };
        if url.is_empty() {
            return Err(Error::Config(format!("no URL configured for {stage}")));
        }
        Ok(url)
    }

    async fn post<T: Serialize + Sync>(&self, stage: Stage, body: &T) -> Result<()> {
        let url = self.url_for(stage)?;
        let response = self
            .client
            .post(url)
            .json(body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| Error::dispatch(stage.label(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::dispatch(
                stage.label(),
                format!("worker returned {status}"),
            ));
        }

        tracing::info!(stage = %stage, status = %status, "forwarded to worker");
        Ok(())
    }
}

#[async_trait]
impl WorkerDispatcher for HttpDispatcher {
    async fn start_run(&self, request: &RunRequest) -> Result<()> {
        // The typed struct is re-serialized verbatim, probabilities
        // included, so numbers stay numbers across the hop.
        self.post(Stage::Extractor, request).await
    }

    async fn invoke(&self, stage: Stage, date: &str) -> Result<()> {
        self.post(stage, &StageInvocation { date }).await
    }
}

/// Dispatcher that records invocations in memory, for tests.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    runs: Mutex<Vec<RunRequest>>,
    invocations: Mutex<Vec<(Stage, String)>>,
    fail: bool,
}

impl RecordingDispatcher {
    /// Creates a recorder that accepts every dispatch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a recorder that fails every dispatch (transport-down tests).
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Returns the forwarded run requests.
    ///
    /// # Panics
    ///
    /// Panics if the interior lock is poisoned.
    #[must_use]
    pub fn runs(&self) -> Vec<RunRequest> {
        self.runs.lock().expect("dispatcher lock poisoned").clone()
    }

    /// Returns the recorded `(stage, date)` invocations.
    ///
    /// # Panics
    ///
    /// Panics if the interior lock is poisoned.
    #[must_use]
    pub fn invocations(&self) -> Vec<(Stage, String)> {
        self.invocations
            .lock()
            .expect("dispatcher lock poisoned")
            .clone()
    }
}

#[async_trait]
impl WorkerDispatcher for RecordingDispatcher {
    async fn start_run(&self, request: &RunRequest) -> Result<()> {
        if self.fail {
            return Err(Error::dispatch("extractor", "simulated transport failure"));
        }
        self.runs
            .lock()
            .expect("dispatcher lock poisoned")
            .push(request.clone());
        Ok(())
    }

    async fn invoke(&self, stage: Stage, date: &str) -> Result<()> {
        if self.fail {
            return Err(Error::dispatch(stage.label(), "simulated transport failure"));
        }
        self.invocations
            .lock()
            .expect("dispatcher lock poisoned")
            .push((stage, date.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_dispatcher_captures_invocations() {
        let dispatcher = RecordingDispatcher::new();
        dispatcher
            .invoke(Stage::Cleaner, "2025-03-30")
            .await
            .expect("invoke should succeed");

        assert_eq!(
            dispatcher.invocations(),
            vec![(Stage::Cleaner, "2025-03-30".to_string())]
        );
    }

    #[tokio::test]
    async fn failing_dispatcher_simulates_transport_failure() {
        let dispatcher = RecordingDispatcher::failing();
        let err = dispatcher
            .start_run(&RunRequest::quiet("2025-03-30", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Dispatch { .. }));
    }

    #[test]
    fn dispatcher_rejects_unconfigured_stage() {
        let dispatcher = HttpDispatcher::new(ServiceUrls::default()).expect("build");
        let err = dispatcher.url_for(Stage::Cleaner).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn stage_invocation_serializes_date_only() {
        let body = serde_json::to_value(StageInvocation { date: "2025-03-30" }).expect("serialize");
        assert_eq!(body, serde_json::json!({"date": "2025-03-30"}));
    }
}
