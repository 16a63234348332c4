use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use object_store::aws::{AmazonS3Builder, S3ConditionalPut};
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ObjectStore, PutMode, PutPayload, UpdateVersion};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::config::StoreConfig;
use super::error::StoreError;
use super::metadata::NodeHeader;
use super::traits::{StoreClient, StoreNode};

/// [`StoreClient`] over an object store with conditional puts.
///
/// `create_if_absent` is a `PutMode::Create` and `compare_and_swap` is a
/// `PutMode::Update` guarded by the e-tag observed on the preceding read, so
/// the backing store arbitrates every race. Indices are counted per key.
///
/// `delete` overwrites the object with a tombstone under the same e-tag
/// guard, so a recreated key continues from the deleted node's index and a
/// write racing the delete is reported instead of lost.
#[derive(Debug, Clone)]
pub struct ObjectStoreClient {
    store: Arc<dyn ObjectStore>,
}

struct Stored {
    header: NodeHeader,
    value: Bytes,
    version: UpdateVersion,
}

impl ObjectStoreClient {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    pub fn from_config(config: StoreConfig) -> Result<Self> {
        let store: Arc<dyn ObjectStore> = match config {
            StoreConfig::Memory => Arc::new(InMemory::new()),
            StoreConfig::S3 {
                bucket,
                region,
                endpoint,
                access_key_id,
                secret_access_key,
                allow_http,
            } => {
                let mut builder = AmazonS3Builder::new()
                    .with_bucket_name(&bucket)
                    .with_allow_http(allow_http)
                    .with_conditional_put(S3ConditionalPut::ETagMatch);
                if let Some(region) = region {
                    builder = builder.with_region(region);
                }
                if let Some(endpoint) = endpoint {
                    builder = builder.with_endpoint(endpoint);
                }
                if let Some(access_key_id) = access_key_id {
                    builder = builder.with_access_key_id(access_key_id);
                }
                if let Some(secret_access_key) = secret_access_key {
                    builder = builder.with_secret_access_key(secret_access_key);
                }
                Arc::new(
                    builder
                        .build()
                        .with_context(|| format!("Failed to configure S3 bucket {bucket}"))?,
                )
            }
        };
        Ok(Self { store })
    }

    fn path(key: &str) -> Path {
        Path::from(key.trim_start_matches('/'))
    }

    async fn fetch(&self, path: &Path) -> Result<Option<Stored>, StoreError> {
        let result = match self.store.get(path).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(StoreError::unavailable(e)),
        };
        let version = UpdateVersion {
            e_tag: result.meta.e_tag.clone(),
            version: result.meta.version.clone(),
        };
        let raw = result.bytes().await.map_err(StoreError::unavailable)?;
        let (header, value) = NodeHeader::unframe(raw)?;
        Ok(Some(Stored {
            header,
            value,
            version,
        }))
    }

    async fn fetch_live(&self, key: &str, now: DateTime<Utc>) -> Result<Stored, StoreError> {
        match self.fetch(&Self::path(key)).await? {
            Some(stored) if stored.header.is_live(now) => Ok(stored),
            _ => Err(StoreError::NotFound {
                key: key.to_string(),
            }),
        }
    }

    async fn write(
        &self,
        key: &str,
        header: &NodeHeader,
        value: &Bytes,
        mode: PutMode,
    ) -> Result<(), WriteError> {
        let payload = PutPayload::from(header.frame(value).map_err(WriteError::Store)?);
        match self
            .store
            .put_opts(&Self::path(key), payload, mode.into())
            .await
        {
            Ok(_) => Ok(()),
            Err(object_store::Error::AlreadyExists { .. }) => Err(WriteError::Exists),
            Err(object_store::Error::Precondition { .. }) => Err(WriteError::Precondition),
            Err(e) => Err(WriteError::Store(StoreError::unavailable(e))),
        }
    }

    /// The object exists but may be a tombstone or an expired node; take it
    /// over if so, continuing from its last index.
    async fn replace_expired(
        &self,
        key: &str,
        value: Bytes,
        ttl: Option<Duration>,
        now: DateTime<Utc>,
    ) -> Result<StoreNode, StoreError> {
        let exists = || StoreError::AlreadyExists {
            key: key.to_string(),
        };
        let stored = match self.fetch(&Self::path(key)).await? {
            Some(stored) if !stored.header.is_live(now) => stored,
            _ => return Err(exists()),
        };

        let header = NodeHeader::created(key, stored.header.modified_index + 1, ttl, now);
        match self
            .write(key, &header, &value, PutMode::Update(stored.version))
            .await
        {
            Ok(()) => {
                debug!(key, index = header.modified_index, "replaced dead node");
                Ok(header.to_node(value, now))
            }
            Err(WriteError::Precondition | WriteError::Exists) => Err(exists()),
            Err(WriteError::Store(err)) => Err(err),
        }
    }
}

enum WriteError {
    Exists,
    Precondition,
    Store(StoreError),
}

#[async_trait]
impl StoreClient for ObjectStoreClient {
    async fn get(&self, key: &str) -> Result<StoreNode, StoreError> {
        let now = Utc::now();
        let stored = self.fetch_live(key, now).await?;
        Ok(stored.header.to_node(stored.value, now))
    }

    async fn create_if_absent(
        &self,
        key: &str,
        value: Bytes,
        ttl: Option<Duration>,
    ) -> Result<StoreNode, StoreError> {
        let now = Utc::now();
        let header = NodeHeader::created(key, 1, ttl, now);
        match self.write(key, &header, &value, PutMode::Create).await {
            Ok(()) => {
                debug!(key, "object store create");
                Ok(header.to_node(value, now))
            }
            Err(WriteError::Exists) => self.replace_expired(key, value, ttl, now).await,
            Err(WriteError::Precondition) => Err(StoreError::AlreadyExists {
                key: key.to_string(),
            }),
            Err(WriteError::Store(err)) => Err(err),
        }
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        value: Bytes,
        expected_index: u64,
        ttl: Option<Duration>,
    ) -> Result<StoreNode, StoreError> {
        let now = Utc::now();
        let stored = self.fetch_live(key, now).await?;
        let conflict = || StoreError::VersionConflict {
            key: key.to_string(),
            expected: expected_index,
        };

        if stored.header.modified_index != expected_index {
            return Err(conflict());
        }

        let header = stored
            .header
            .modified(stored.header.modified_index + 1, ttl, now);
        match self
            .write(key, &header, &value, PutMode::Update(stored.version))
            .await
        {
            Ok(()) => {
                debug!(key, index = header.modified_index, "object store swap");
                Ok(header.to_node(value, now))
            }
            Err(WriteError::Precondition | WriteError::Exists) => Err(conflict()),
            Err(WriteError::Store(err)) => Err(err),
        }
    }

    async fn delete(&self, key: &str) -> Result<StoreNode, StoreError> {
        let now = Utc::now();
        let stored = self.fetch_live(key, now).await?;
        let tombstone = stored.header.tombstone();
        match self
            .write(key, &tombstone, &Bytes::new(), PutMode::Update(stored.version))
            .await
        {
            Ok(()) => {
                debug!(key, index = tombstone.modified_index, "object store delete");
                Ok(stored.header.to_node(stored.value, now))
            }
            Err(WriteError::Precondition | WriteError::Exists) => {
                Err(StoreError::VersionConflict {
                    key: key.to_string(),
                    expected: stored.header.modified_index,
                })
            }
            Err(WriteError::Store(err)) => Err(err),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<StoreNode>, StoreError> {
        let now = Utc::now();
        let metas: Vec<_> = self
            .store
            .list(Some(&Self::path(prefix)))
            .try_collect()
            .await
            .map_err(StoreError::unavailable)?;

        let mut nodes = Vec::with_capacity(metas.len());
        for meta in metas {
            // Objects can vanish between the listing and the read
            let Some(stored) = self.fetch(&meta.location).await? else {
                continue;
            };
            if !stored.header.is_live(now) || !stored.header.key.starts_with(prefix) {
                continue;
            }
            nodes.push(stored.header.to_node(stored.value, now));
        }
        nodes.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(nodes)
    }
}
