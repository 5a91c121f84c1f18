//! The extractor's resume checkpoint.
//!
//! A single durable scalar at a well-known path: the next offset to fetch.
//! It is read at the start of each run and written after each durably
//! stored chunk, so it only ever moves forward on real progress. Reads are
//! lenient — a missing or unparsable checkpoint restarts from offset 0,
//! which is safe because chunk writes are idempotent.

use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::paths::CHECKPOINT_PATH;
use crate::storage::StorageBackend;

#[derive(Debug, Serialize, Deserialize)]
struct CheckpointDoc {
    last_offset: u64,
}

/// Reads and writes the extractor checkpoint.
#[derive(Clone)]
pub struct CheckpointStore {
    storage: Arc<dyn StorageBackend>,
    path: String,
}

impl std::fmt::Debug for CheckpointStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckpointStore")
            .field("storage", &"<StorageBackend>")
            .field("path", &self.path)
            .finish()
    }
}

impl CheckpointStore {
    /// Creates a checkpoint store at the well-known path.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            storage,
            path: CHECKPOINT_PATH.to_string(),
        }
    }

    /// Reads the last durable offset.
    ///
    /// Missing or unparsable checkpoints read as 0 (start of feed); only
    /// genuine storage failures surface as errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails for a reason other
    /// than the object being absent.
    pub async fn read(&self) -> Result<u64> {
        let body = match self.storage.get(&self.path).await {
            Ok(body) => body,
            Err(e) if e.is_not_found() => {
                tracing::info!("no checkpoint found, starting from offset 0");
                return Ok(0);
            }
            Err(e) => return Err(e),
        };

        match serde_json::from_slice::<CheckpointDoc>(&body) {
            Ok(doc) => Ok(doc.last_offset),
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse checkpoint, starting from offset 0");
                Ok(0)
            }
        }
    }

    /// Persists `offset` as the last durable offset.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the storage write fails.
    pub async fn write(&self, offset: u64) -> Result<()> {
        let body = serde_json::to_vec_pretty(&CheckpointDoc {
            last_offset: offset,
        })
        .map_err(Error::serialization)?;

        self.storage.put(&self.path, Bytes::from(body)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;

    #[tokio::test]
    async fn missing_checkpoint_reads_as_zero() {
        let store = CheckpointStore::new(Arc::new(MemoryBackend::new()));
        assert_eq!(store.read().await.expect("read should succeed"), 0);
    }

    #[tokio::test]
    async fn write_then_read_roundtrips() {
        let store = CheckpointStore::new(Arc::new(MemoryBackend::new()));
        store.write(3000).await.expect("write should succeed");
        assert_eq!(store.read().await.expect("read should succeed"), 3000);
    }

    #[tokio::test]
    async fn unparsable_checkpoint_reads_as_zero() {
        let storage = Arc::new(MemoryBackend::new());
        storage
            .put(CHECKPOINT_PATH, Bytes::from("{broken"))
            .await
            .expect("put should succeed");

        let store = CheckpointStore::new(storage);
        assert_eq!(store.read().await.expect("read should succeed"), 0);
    }

    #[tokio::test]
    async fn checkpoint_uses_wire_field_name() {
        let storage = Arc::new(MemoryBackend::new());
        let store = CheckpointStore::new(Arc::clone(&storage) as Arc<dyn StorageBackend>);
        store.write(1000).await.expect("write should succeed");

        let body = storage.get(CHECKPOINT_PATH).await.expect("get");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("parse");
        assert_eq!(json["last_offset"], 1000);
    }
}
