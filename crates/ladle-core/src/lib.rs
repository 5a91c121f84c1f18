//! # ladle-core
//!
//! Shared contracts for the Ladle ingestion pipeline.
//!
//! This crate provides the foundational types used by the extractor, the
//! trigger orchestrator, and any downstream stage worker:
//!
//! - **Storage**: Object-storage abstraction with memory and cloud backends
//! - **Paths**: The canonical bucket layout for chunks, manifests, and telemetry
//! - **Manifest Protocol**: The per-date, per-stage completion contract
//! - **Checkpoint**: The extractor's scalar resume offset
//! - **Events**: Lifecycle messages every stage posts to the trigger
//! - **Faults**: Clamped, seedable fault-injection gates
//! - **Telemetry**: Per-chunk metric rows and sinks
//!
//! ## Crate Boundary
//!
//! `ladle-core` is the only crate allowed to define cross-stage contracts.
//! The extractor and trigger never exchange types that don't live here.
//!
//! ## Example
//!
//! ```rust
//! use ladle_core::prelude::*;
//!
//! let request = RunRequest::quiet("2025-03-30", 2000);
//! assert!(request.fault_plan().is_quiet());
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod events;
pub mod faults;
pub mod manifest;
pub mod observability;
pub mod paths;
pub mod request;
pub mod storage;
pub mod telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use ladle_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::checkpoint::CheckpointStore;
    pub use crate::error::{Error, Result};
    pub use crate::events::{EventKind, PipelineEvent};
    pub use crate::faults::{FaultGates, FaultPlan};
    pub use crate::manifest::{ManifestStore, StageManifest};
    pub use crate::paths::{CHECKPOINT_PATH, StagePaths};
    pub use crate::request::RunRequest;
    pub use crate::storage::{MemoryBackend, ObjectMeta, ObjectStoreBackend, StorageBackend};
    pub use crate::telemetry::{ChunkMetric, ChunkMetricsSink, MemorySink, StorageSink};
}

// Re-export key types at crate root for ergonomics
pub use checkpoint::CheckpointStore;
pub use error::{Error, Result};
pub use events::{EventKind, PipelineEvent};
pub use faults::{FaultGates, FaultPlan};
pub use manifest::{ManifestStore, StageManifest};
pub use observability::{LogFormat, init_logging};
pub use paths::StagePaths;
pub use request::RunRequest;
pub use storage::{MemoryBackend, ObjectMeta, ObjectStoreBackend, StorageBackend};
pub use telemetry::{ChunkMetric, ChunkMetricsSink, MemorySink, StorageSink};
