//! # ladle-trigger
//!
//! Event-driven orchestrator for the Ladle ingestion pipeline.
//!
//! The trigger is the pipeline's entry point and its only coordinator:
//! it forwards run requests to the extractor, routes stage completion
//! events to the next worker, deduplicates on `(date, event)`, and keeps
//! per-origin duration logs.
//!
//! ## Guarantees
//!
//! - **At-most-once forwarding**: a `(date, event)` pair is routed at most
//!   once per process lifetime, protecting workers from double-invocation
//! - **Always-answer ingress**: well-formed events get `200` even when
//!   they are duplicates or unknown; a wedged worker can't wedge the
//!   pipeline's front door
//!
//! The pipeline graph is strictly a DAG expressed by the routing table;
//! no component holds a reference to another — coupling is by URL
//! configuration injected at startup.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod cache;
pub mod config;
pub mod dispatch;
pub mod durations;
pub mod error;
pub mod metrics;
pub mod routing;
pub mod server;

pub use cache::CompletionCache;
pub use config::{Config, ServiceUrls, StageEndpoint};
pub use dispatch::{HttpDispatcher, Stage, WorkerDispatcher};
pub use durations::DurationLog;
pub use error::{Error, Result};
pub use routing::{Disposition, IncomingEvent, RouteAction, Router, route};
pub use server::Server;
