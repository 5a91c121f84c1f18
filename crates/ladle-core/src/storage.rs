//! Storage backend abstraction for object storage (GCS, S3, local).
//!
//! The pipeline's durable state — raw chunks, manifests, the extractor
//! checkpoint, and telemetry rows — lives entirely in object storage.
//! Blob writes are last-writer-wins: a chunk at a given offset replaces any
//! earlier attempt, which is what makes retried runs idempotent.
//!
//! Two backends are provided: [`MemoryBackend`] for tests and
//! [`ObjectStoreBackend`] for real buckets via the `object_store` crate,
//! keeping cloud-specific assumptions out of the pipeline code.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use object_store::ObjectStore;

use crate::error::{Error, Result};

/// Metadata about a stored object.
#[derive(Debug, Clone)]
pub struct ObjectMeta {
    /// Object path (key).
    pub path: String,
    /// Object size in bytes.
    pub size: u64,
    /// Last modification timestamp.
    pub last_modified: Option<DateTime<Utc>>,
}

/// Storage backend trait for object storage.
///
/// All backends (GCS, S3, local filesystem, memory) implement this trait.
/// Writes replace unconditionally; the manifest protocol, not storage
/// preconditions, provides cross-stage synchronization.
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Reads an entire object.
    ///
    /// Returns `Error::NotFound` if the object doesn't exist.
    async fn get(&self, path: &str) -> Result<Bytes>;

    /// Writes an object, replacing any existing content.
    async fn put(&self, path: &str, data: Bytes) -> Result<()>;

    /// Deletes an object.
    ///
    /// Succeeds even if the object doesn't exist (idempotent).
    async fn delete(&self, path: &str) -> Result<()>;

    /// Lists objects with the given prefix.
    ///
    /// Returns an empty vec if no objects match. Ordering is
    /// backend-dependent; callers needing a stable order should sort.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>>;

    /// Gets object metadata without reading content.
    ///
    /// Returns `None` if the object doesn't exist.
    async fn head(&self, path: &str) -> Result<Option<ObjectMeta>>;
}

/// In-memory storage backend for testing.
///
/// Thread-safe via `RwLock`. Not suitable for production.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    last_modified: DateTime<Utc>,
}

impl MemoryBackend {
    /// Creates a new empty memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get(&self, path: &str) -> Result<Bytes> {
        let objects = self.objects.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;

        objects
            .get(path)
            .map(|o| o.data.clone())
            .ok_or_else(|| Error::NotFound(format!("object not found: {path}")))
    }

    async fn put(&self, path: &str, data: Bytes) -> Result<()> {
        let mut objects = self.objects.write().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;

        objects.insert(
            path.to_string(),
            StoredObject {
                data,
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.objects
            .write()
            .map_err(|_| Error::Internal {
                message: "lock poisoned".into(),
            })?
            .remove(path);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>> {
        let objects = self.objects.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;

        Ok(objects
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(path, obj)| ObjectMeta {
                path: path.clone(),
                size: obj.data.len() as u64,
                last_modified: Some(obj.last_modified),
            })
            .collect())
    }

    async fn head(&self, path: &str) -> Result<Option<ObjectMeta>> {
        let objects = self.objects.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;

        Ok(objects.get(path).map(|obj| ObjectMeta {
            path: path.to_string(),
            size: obj.data.len() as u64,
            last_modified: Some(obj.last_modified),
        }))
    }
}

/// Storage backend over the `object_store` crate (GCS, S3, local).
pub struct ObjectStoreBackend {
    store: Arc<dyn ObjectStore>,
}

impl std::fmt::Debug for ObjectStoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreBackend")
            .field("store", &"<ObjectStore>")
            .finish()
    }
}

impl ObjectStoreBackend {
    /// Creates a backend over an existing `object_store` instance.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Creates a backend from a bucket spec.
    ///
    /// Accepts `gs://bucket`, `s3://bucket`, or a bare bucket name
    /// (interpreted as GCS). Credentials come from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the bucket spec is empty or the backend cannot
    /// be constructed.
    pub fn from_bucket(bucket: &str) -> Result<Self> {
        let spec = bucket.trim();
        if spec.is_empty() {
            return Err(Error::InvalidInput("bucket name must not be empty".into()));
        }

        let store: Arc<dyn ObjectStore> = if let Some(name) = spec.strip_prefix("s3://") {
            Arc::new(
                object_store::aws::AmazonS3Builder::from_env()
                    .with_bucket_name(name)
                    .build()
                    .map_err(|e| Error::storage_with_source("failed to build S3 backend", e))?,
            )
        } else {
            let name = spec.strip_prefix("gs://").unwrap_or(spec);
            Arc::new(
                object_store::gcp::GoogleCloudStorageBuilder::from_env()
                    .with_bucket_name(name)
                    .build()
                    .map_err(|e| Error::storage_with_source("failed to build GCS backend", e))?,
            )
        };

        Ok(Self { store })
    }

    fn store_path(path: &str) -> Result<object_store::path::Path> {
        object_store::path::Path::parse(path)
            .map_err(|e| Error::InvalidInput(format!("invalid object path {path}: {e}")))
    }
}

fn map_store_error(path: &str, err: object_store::Error) -> Error {
    match err {
        object_store::Error::NotFound { .. } => Error::NotFound(format!("object not found: {path}")),
        other => Error::storage_with_source(format!("object store operation failed: {path}"), other),
    }
}

#[async_trait]
impl StorageBackend for ObjectStoreBackend {
    async fn get(&self, path: &str) -> Result<Bytes> {
        let location = Self::store_path(path)?;
        let result = self
            .store
            .get(&location)
            .await
            .map_err(|e| map_store_error(path, e))?;
        result.bytes().await.map_err(|e| map_store_error(path, e))
    }

    async fn put(&self, path: &str, data: Bytes) -> Result<()> {
        let location = Self::store_path(path)?;
        self.store
            .put(&location, data.into())
            .await
            .map_err(|e| map_store_error(path, e))?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let location = Self::store_path(path)?;
        match self.store.delete(&location).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(map_store_error(path, e)),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>> {
        let location = Self::store_path(prefix)?;
        let metas: Vec<object_store::ObjectMeta> = self
            .store
            .list(Some(&location))
            .try_collect()
            .await
            .map_err(|e| map_store_error(prefix, e))?;

        Ok(metas
            .into_iter()
            .map(|meta| ObjectMeta {
                path: meta.location.to_string(),
                size: u64::try_from(meta.size).unwrap_or(u64::MAX),
                last_modified: Some(meta.last_modified),
            })
            .collect())
    }

    async fn head(&self, path: &str) -> Result<Option<ObjectMeta>> {
        let location = Self::store_path(path)?;
        match self.store.head(&location).await {
            Ok(meta) => Ok(Some(ObjectMeta {
                path: meta.location.to_string(),
                size: u64::try_from(meta.size).unwrap_or(u64::MAX),
                last_modified: Some(meta.last_modified),
            })),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(map_store_error(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_backend_roundtrip() {
        let backend = MemoryBackend::new();
        let data = Bytes::from("hello world");

        backend
            .put("raw-data/2025-03-30/offset_0.json", data.clone())
            .await
            .expect("put should succeed");

        let retrieved = backend
            .get("raw-data/2025-03-30/offset_0.json")
            .await
            .expect("get should succeed");
        assert_eq!(retrieved, data);
    }

    #[tokio::test]
    async fn memory_backend_get_missing_is_not_found() {
        let backend = MemoryBackend::new();
        let err = backend.get("nope.json").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn memory_backend_put_replaces() {
        let backend = MemoryBackend::new();
        backend.put("a.json", Bytes::from("v1")).await.unwrap();
        backend.put("a.json", Bytes::from("v2")).await.unwrap();

        let data = backend.get("a.json").await.unwrap();
        assert_eq!(data, Bytes::from("v2"));
    }

    #[tokio::test]
    async fn memory_backend_list_with_prefix() {
        let backend = MemoryBackend::new();
        backend
            .put("raw-data/2025-03-30/offset_0.json", Bytes::from("a"))
            .await
            .unwrap();
        backend
            .put("raw-data/2025-03-30/offset_1000.json", Bytes::from("b"))
            .await
            .unwrap();
        backend
            .put("raw-data/2025-03-31/offset_0.json", Bytes::from("c"))
            .await
            .unwrap();

        let listed = backend.list("raw-data/2025-03-30/").await.unwrap();
        assert_eq!(listed.len(), 2);
    }

    #[tokio::test]
    async fn memory_backend_head_and_delete() {
        let backend = MemoryBackend::new();
        backend.put("del.json", Bytes::from("data")).await.unwrap();

        let meta = backend.head("del.json").await.unwrap().expect("exists");
        assert_eq!(meta.size, 4);
        assert!(meta.last_modified.is_some());

        backend.delete("del.json").await.unwrap();
        assert!(backend.head("del.json").await.unwrap().is_none());

        // Deleting again is idempotent.
        backend.delete("del.json").await.unwrap();
    }

    #[test]
    fn from_bucket_rejects_empty_spec() {
        let err = ObjectStoreBackend::from_bucket("  ").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
