//! Object storage backend abstraction (S3/MinIO/local filesystem/memory).

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use serde::{Deserialize, Serialize};

use common::store::{StagingStore, StoreError};

use crate::error::{Result, StagingError};

/// Configuration for the object storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectStoreConfig {
    /// In-memory storage (for testing)
    #[default]
    Memory,

    /// Local filesystem storage
    Local {
        /// Path to the storage directory
        path: PathBuf,
    },

    /// S3-compatible storage (AWS S3, MinIO, R2, etc.)
    S3 {
        /// S3 endpoint URL (e.g., "http://localhost:9000" for MinIO)
        endpoint: String,
        /// Access key ID
        access_key: String,
        /// Secret access key
        secret_key: String,
        /// Bucket name
        bucket: String,
        /// Optional region (defaults to "us-east-1")
        region: Option<String>,
    },
}

/// Staging area backed by an object store.
#[derive(Debug, Clone)]
pub struct ObjectStaging {
    inner: Arc<dyn ObjectStore>,
}

impl ObjectStaging {
    /// Create a new staging backend from configuration.
    pub async fn new(config: ObjectStoreConfig) -> Result<Self> {
        let inner: Arc<dyn ObjectStore> = match &config {
            ObjectStoreConfig::Memory => Arc::new(InMemory::new()),

            ObjectStoreConfig::Local { path } => {
                // Ensure directory exists
                tokio::fs::create_dir_all(path).await?;
                Arc::new(
                    LocalFileSystem::new_with_prefix(path)
                        .map_err(|e| StagingError::InvalidConfig(e.to_string()))?,
                )
            }

            ObjectStoreConfig::S3 {
                endpoint,
                access_key,
                secret_key,
                bucket,
                region,
            } => {
                let builder = AmazonS3Builder::new()
                    .with_endpoint(endpoint)
                    .with_access_key_id(access_key)
                    .with_secret_access_key(secret_key)
                    .with_bucket_name(bucket)
                    .with_region(region.as_deref().unwrap_or("us-east-1"))
                    .with_allow_http(endpoint.starts_with("http://"));

                let store: Arc<dyn ObjectStore> = Arc::new(
                    builder
                        .build()
                        .map_err(|e| StagingError::InvalidConfig(e.to_string()))?,
                );

                // Fail fast if the bucket doesn't exist
                let mut stream = store.list(Some(&ObjectPath::from("")));
                match stream.try_next().await {
                    Ok(_) => {}
                    Err(object_store::Error::NotFound { .. }) => {
                        return Err(StagingError::BucketNotFound(bucket.clone()));
                    }
                    Err(e) => {
                        let msg = e.to_string();
                        if msg.contains("NoSuchBucket") {
                            return Err(StagingError::BucketNotFound(bucket.clone()));
                        }
                        return Err(e.into());
                    }
                }
                drop(stream);

                store
            }
        };

        tracing::info!(backend = config.kind(), "staging store ready");
        Ok(Self { inner })
    }

    /// Create an in-memory staging backend.
    pub fn memory() -> Self {
        Self {
            inner: Arc::new(InMemory::new()),
        }
    }

    fn object_path(key: &str) -> Result<ObjectPath> {
        if key.is_empty() {
            return Err(StagingError::InvalidKey(key.to_string()));
        }
        ObjectPath::parse(key).map_err(|_| StagingError::InvalidKey(key.to_string()))
    }

    /// Write an object.
    pub async fn put_object(&self, key: &str, data: Bytes) -> Result<()> {
        let path = Self::object_path(key)?;
        self.inner.put(&path, data.into()).await?;
        Ok(())
    }

    /// Read an object, `None` if it does not exist.
    pub async fn get_object(&self, key: &str) -> Result<Option<Bytes>> {
        let path = Self::object_path(key)?;
        match self.inner.get(&path).await {
            Ok(result) => Ok(Some(result.bytes().await?)),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List every key under `prefix`.
    pub async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = ObjectPath::from(prefix);
        let items: Vec<_> = self.inner.list(Some(&prefix)).try_collect().await?;
        let mut keys: Vec<String> = items
            .into_iter()
            .map(|meta| meta.location.to_string())
            .collect();
        keys.sort();
        Ok(keys)
    }
}

impl ObjectStoreConfig {
    fn kind(&self) -> &'static str {
        match self {
            ObjectStoreConfig::Memory => "memory",
            ObjectStoreConfig::Local { .. } => "local",
            ObjectStoreConfig::S3 { .. } => "s3",
        }
    }
}

impl From<StagingError> for StoreError {
    fn from(err: StagingError) -> Self {
        match err {
            StagingError::InvalidKey(_) | StagingError::InvalidConfig(_) => {
                StoreError::Invalid(err.to_string())
            }
            StagingError::ObjectStore(object_store::Error::NotFound { .. }) => {
                StoreError::NotFound(err.to_string())
            }
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

#[async_trait]
impl StagingStore for ObjectStaging {
    async fn put(&self, key: &str, data: Bytes) -> std::result::Result<(), StoreError> {
        Ok(self.put_object(key, data).await?)
    }

    async fn get(&self, key: &str) -> std::result::Result<Option<Bytes>, StoreError> {
        Ok(self.get_object(key).await?)
    }

    async fn is_ready(&self) -> std::result::Result<(), StoreError> {
        let prefix = ObjectPath::from("staging");
        let mut stream = self.inner.list(Some(&prefix));
        stream
            .try_next()
            .await
            .map(|_| ())
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}
