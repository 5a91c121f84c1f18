//! # ladle-extractor
//!
//! Resumable chunked extractor for the Ladle ingestion pipeline.
//!
//! Pulls paginated records from a public REST feed in fixed-size chunks,
//! writes NDJSON blobs and a per-date manifest to object storage, emits
//! per-chunk telemetry, and reports lifecycle events to the trigger.
//!
//! ## Guarantees
//!
//! - **Resumable**: a scalar checkpoint advances only on durable writes,
//!   so a crashed or faulted run is retried from the last stored chunk
//! - **Accountable**: every attempted chunk yields exactly one telemetry
//!   row, with flags separating real work from injected-fault skips
//! - **Chaos-ready**: fault gates live on the production code path and are
//!   driven by per-run probabilities in the request

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod feed;
pub mod metrics;
pub mod notify;
pub mod run;
pub mod server;

pub use config::Config;
pub use error::{Error, Result};
pub use feed::{HttpFeed, RetryPolicy, SourceFeed};
pub use notify::{HttpNotifier, NullNotifier, TriggerNotifier};
pub use run::{CHUNK_SIZE, Extractor, RunOutcome};
pub use server::Server;
