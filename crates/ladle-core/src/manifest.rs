//! The per-date, per-stage manifest: the pipeline's only cross-stage
//! synchronization primitive.
//!
//! A stage writes `{prefix}/{date}/_manifest.json` exactly once, at stage
//! end, with `upload_complete: true`. Downstream workers gate on it: a
//! missing manifest or `upload_complete: false` means "not done" and the
//! worker must return success with zero work. Absence of the manifest is
//! the crash signal — a run that dies mid-extraction leaves chunks behind
//! but never a manifest, so the next run can resume from the checkpoint
//! without a downstream stage consuming a partial date.

use std::sync::Arc;

use bytes::Bytes;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::paths::StagePaths;
use crate::storage::StorageBackend;

/// The durable "stage complete for this date" marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageManifest {
    /// The calendar day this manifest covers (`YYYY-MM-DD`).
    pub date: String,
    /// Basenames of every chunk the stage produced for this date.
    pub files: Vec<String>,
    /// True once the stage has finished writing all listed files.
    pub upload_complete: bool,
}

impl StageManifest {
    /// Creates a completed manifest for `date` listing `files`.
    #[must_use]
    pub fn completed(date: NaiveDate, files: Vec<String>) -> Self {
        Self {
            date: date.to_string(),
            files,
            upload_complete: true,
        }
    }
}

/// Reads and writes stage manifests under one stage prefix.
#[derive(Clone)]
pub struct ManifestStore {
    storage: Arc<dyn StorageBackend>,
    paths: StagePaths,
}

impl std::fmt::Debug for ManifestStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestStore")
            .field("storage", &"<StorageBackend>")
            .field("paths", &self.paths)
            .finish()
    }
}

impl ManifestStore {
    /// Creates a manifest store for the given stage prefix.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>, paths: StagePaths) -> Self {
        Self { storage, paths }
    }

    /// Returns the typed paths this store operates under.
    #[must_use]
    pub fn paths(&self) -> &StagePaths {
        &self.paths
    }

    /// Writes the stage-end manifest for `date`.
    ///
    /// Last-writer-wins at the blob level; callers are expected to write at
    /// most once per (stage, date).
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the storage write fails.
    pub async fn write(&self, manifest: &StageManifest) -> Result<()> {
        let date: NaiveDate = manifest
            .date
            .parse()
            .map_err(|e| Error::InvalidInput(format!("manifest date {}: {e}", manifest.date)))?;

        let body = serde_json::to_vec_pretty(manifest).map_err(Error::serialization)?;
        self.storage
            .put(&self.paths.manifest(date), Bytes::from(body))
            .await
    }

    /// Reads the manifest for `date`, gated on completeness.
    ///
    /// Returns `None` when the manifest is absent or has
    /// `upload_complete: false` — the caller must treat the date as not
    /// ready and do zero work.
    ///
    /// # Errors
    ///
    /// Returns an error only for storage failures or an unparsable
    /// manifest body; a missing object is not an error.
    pub async fn read_gated(&self, date: NaiveDate) -> Result<Option<StageManifest>> {
        let body = match self.storage.get(&self.paths.manifest(date)).await {
            Ok(body) => body,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };

        let manifest: StageManifest =
            serde_json::from_slice(&body).map_err(Error::serialization)?;

        if !manifest.upload_complete {
            return Ok(None);
        }
        Ok(Some(manifest))
    }
}
