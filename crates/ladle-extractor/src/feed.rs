//! Source feed client.
//!
//! The upstream feed is a paginated read-only REST endpoint:
//! `GET {source_url}?limit={chunk_size}&offset={N}` returns a JSON array.
//! Transient failures (5xx, socket errors) are retried with a bounded
//! exponential backoff ladder; the feed staying down through the whole
//! ladder aborts the current run.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{Error, Result};
use crate::metrics::ExtractorMetrics;

/// A paginated source of raw records.
///
/// The trait seam exists so tests can script page sequences without a
/// network; production uses [`HttpFeed`].
#[async_trait]
pub trait SourceFeed: Send + Sync + 'static {
    /// Fetches one page of records.
    ///
    /// Returns the raw response body; callers parse and decide on
    /// exhaustion.
    async fn fetch_page(&self, limit: u64, offset: u64) -> Result<Bytes>;
}

/// HTTP feed client over `reqwest`.
pub struct HttpFeed {
    client: reqwest::Client,
    base_url: String,
}

impl std::fmt::Debug for HttpFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFeed")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl HttpFeed {
    /// Creates a feed client with the given per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .build()
            .map_err(|e| Error::feed(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl SourceFeed for HttpFeed {
    async fn fetch_page(&self, limit: u64, offset: u64) -> Result<Bytes> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("limit", limit), ("offset", offset)])
            .send()
            .await
            .map_err(Error::feed)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Feed {
                message: format!("unexpected status: {status}"),
            });
        }

        response.bytes().await.map_err(Error::feed)
    }
}

/// Backoff schedule for feed fetches.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts before giving up.
    pub max_attempts: u32,
    /// Sleep before the second attempt; doubles each retry.
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(2),
        }
    }
}

/// Fetches one page through the retry ladder.
///
/// # Errors
///
/// Returns [`Error::FeedRetriesExhausted`] once every attempt has failed.
pub async fn fetch_with_retry(
    feed: &dyn SourceFeed,
    policy: &RetryPolicy,
    limit: u64,
    offset: u64,
) -> Result<Bytes> {
    let mut backoff = policy.initial_backoff;
    let mut attempt = 0;

    loop {
        attempt += 1;
        match feed.fetch_page(limit, offset).await {
            Ok(body) => return Ok(body),
            Err(e) => {
                if attempt >= policy.max_attempts {
                    return Err(Error::FeedRetriesExhausted {
                        attempts: attempt,
                        message: e.to_string(),
                    });
                }
                tracing::warn!(attempt, offset, error = %e, "feed fetch failed, backing off");
                ExtractorMetrics::record_feed_retry();
                tokio::time::sleep(backoff).await;
                backoff = backoff.saturating_mul(2);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Feed stub that fails a fixed number of times before succeeding.
    struct FlakyFeed {
        failures: AtomicU32,
        calls: AtomicU32,
    }

    impl FlakyFeed {
        fn new(failures: u32) -> Self {
            Self {
                failures: AtomicU32::new(failures),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl SourceFeed for FlakyFeed {
        async fn fetch_page(&self, _limit: u64, _offset: u64) -> Result<Bytes> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(Error::Feed {
                    message: "socket reset".into(),
                });
            }
            Ok(Bytes::from(r#"[{"id":"1"}]"#))
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn retry_recovers_from_transient_failures() {
        let feed = FlakyFeed::new(2);
        let body = fetch_with_retry(&feed, &fast_policy(), 1000, 0)
            .await
            .expect("should recover");
        assert!(!body.is_empty());
        assert_eq!(feed.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_gives_up_after_max_attempts() {
        let feed = FlakyFeed::new(100);
        let err = fetch_with_retry(&feed, &fast_policy(), 1000, 0)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::FeedRetriesExhausted { attempts: 5, .. }
        ));
        assert_eq!(feed.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn pages_are_requested_with_limit_and_offset() {
        struct RecordingFeed {
            pages: Mutex<Vec<(u64, u64)>>,
        }

        #[async_trait]
        impl SourceFeed for RecordingFeed {
            async fn fetch_page(&self, limit: u64, offset: u64) -> Result<Bytes> {
                self.pages.lock().expect("lock").push((limit, offset));
                Ok(Bytes::from("[]"))
            }
        }

        let feed = RecordingFeed {
            pages: Mutex::new(Vec::new()),
        };
        fetch_with_retry(&feed, &fast_policy(), 1000, 3000)
            .await
            .expect("fetch should succeed");

        assert_eq!(*feed.pages.lock().expect("lock"), vec![(1000, 3000)]);
    }
}
