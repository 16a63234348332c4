use chrono::Utc;
use event_types::{Event, Resource};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::storage::{
    Codec, DEFAULT_PREFIX, InvalidIdentity, JsonCodec, KeyLayout, StoreClient, StoreError,
    StoreNode,
};

use super::context::RequestContext;
use super::error::{RegistryError, RegistryResult};

/// Events expire an hour after their last write unless configured otherwise
pub const DEFAULT_EVENT_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageOptions {
    /// Fixed prefix every key lives under
    pub key_prefix: String,
    /// TTL handed to the store on every write; `None` stores without expiry
    pub ttl: Option<Duration>,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_PREFIX.to_string(),
            ttl: Some(DEFAULT_EVENT_TTL),
        }
    }
}

/// Stores one kind of object in a [`StoreClient`] with optimistic
/// concurrency.
///
/// The store is the only coordination point: nothing is cached between calls
/// and nothing is locked in-process, so any number of callers (in this
/// process or others) may share a store. Every failure is returned to the
/// caller as-is; no call is retried here.
///
/// `uid`, `creation_timestamp` and `resource_version` are always decided by
/// this type. The first two are fixed at creation and carried across every
/// update; the last always equals the store node's modified index.
pub struct VersionedStore<T, C = JsonCodec> {
    client: Arc<dyn StoreClient>,
    codec: C,
    keys: KeyLayout,
    ttl: Option<Duration>,
    kind: PhantomData<fn() -> T>,
}

pub type EventStorage = VersionedStore<Event>;

pub fn new_event_storage(client: Arc<dyn StoreClient>, options: StorageOptions) -> EventStorage {
    VersionedStore::new(client, JsonCodec, options)
}

impl<T, C> VersionedStore<T, C>
where
    T: Resource,
    C: Codec<T>,
{
    pub fn new(client: Arc<dyn StoreClient>, codec: C, options: StorageOptions) -> Self {
        Self {
            client,
            codec,
            keys: KeyLayout::new(options.key_prefix, T::RESOURCE),
            ttl: options.ttl.filter(|ttl| !ttl.is_zero()),
            kind: PhantomData,
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Store key for `name` in the context namespace.
    pub fn key_for(&self, ctx: &RequestContext, name: &str) -> RegistryResult<String> {
        let namespace = request_namespace(ctx, name)?;
        Ok(self.keys.key_for(namespace, name)?)
    }

    /// Store `object` under a key nothing else holds.
    ///
    /// # Errors
    /// `AlreadyExists` if a live object already has this namespace and name
    #[instrument(skip_all, fields(resource = T::RESOURCE, name = %object.metadata().name))]
    pub async fn create(&self, ctx: &RequestContext, mut object: T) -> RegistryResult<T> {
        let key = self.admit(ctx, &mut object)?;
        self.create_at(ctx, &key, object).await
    }

    /// Replace the stored object, creating it if absent.
    ///
    /// Returns the stored object and whether it was created. A non-empty
    /// `resource_version` on `object` must match the stored version.
    ///
    /// # Errors
    /// `Conflict` if the supplied version is stale or another writer got in
    /// between this call's read and its write
    #[instrument(skip_all, fields(resource = T::RESOURCE, name = %object.metadata().name))]
    pub async fn update(&self, ctx: &RequestContext, mut object: T) -> RegistryResult<(T, bool)> {
        let key = self.admit(ctx, &mut object)?;
        let expected = parse_resource_version(&object.metadata().resource_version)?;
        let namespace = object.metadata().namespace.clone();
        let name = object.metadata().name.clone();

        let current = match ctx.run(self.client.get(&key)).await? {
            Ok(node) => node,
            Err(StoreError::NotFound { .. }) => {
                debug!(key = %key, "not found, creating");
                let created = self.create_at(ctx, &key, object).await?;
                return Ok((created, true));
            }
            Err(err) => return Err(classify::<T>(err, &namespace, &name)),
        };

        if let Some(expected) = expected {
            if expected != current.modified_index {
                warn!(
                    key = %key,
                    expected,
                    actual = current.modified_index,
                    "stale resourceVersion"
                );
                return Err(conflict::<T>(
                    &namespace,
                    &name,
                    format!(
                        "resourceVersion {expected} does not match current {}",
                        current.modified_index
                    ),
                ));
            }
        }

        let existing = self.codec.decode(&current.value)?;
        let meta = object.metadata_mut();
        meta.uid.clone_from(&existing.metadata().uid);
        meta.creation_timestamp = existing.metadata().creation_timestamp;
        meta.resource_version.clear();

        let data = self.codec.encode(&object)?;
        let node = ctx
            .run(self.client.compare_and_swap(
                &key,
                data.into(),
                current.modified_index,
                self.ttl,
            ))
            .await?
            .map_err(|err| match err {
                StoreError::NotFound { .. } => {
                    conflict::<T>(&namespace, &name, "deleted since it was read".to_string())
                }
                StoreError::VersionConflict { .. } => {
                    warn!(key = %key, "lost update race");
                    conflict::<T>(
                        &namespace,
                        &name,
                        format!("resourceVersion {} is no longer current", current.modified_index),
                    )
                }
                other => classify::<T>(other, &namespace, &name),
            })?;

        debug!(key = %key, index = node.modified_index, "updated");
        Ok((self.decode_node(&node)?, false))
    }

    #[instrument(skip_all, fields(resource = T::RESOURCE, name = %name))]
    pub async fn get(&self, ctx: &RequestContext, name: &str) -> RegistryResult<T> {
        let key = self.key_for(ctx, name)?;
        let node = ctx
            .run(self.client.get(&key))
            .await?
            .map_err(|err| classify::<T>(err, ctx.namespace().unwrap_or_default(), name))?;
        self.decode_node(&node)
    }

    /// Remove the object, returning its last stored state.
    ///
    /// # Errors
    /// `Conflict` if another writer changed the object while it was being
    /// removed
    #[instrument(skip_all, fields(resource = T::RESOURCE, name = %name))]
    pub async fn delete(&self, ctx: &RequestContext, name: &str) -> RegistryResult<T> {
        let key = self.key_for(ctx, name)?;
        let node = ctx
            .run(self.client.delete(&key))
            .await?
            .map_err(|err| classify::<T>(err, ctx.namespace().unwrap_or_default(), name))?;
        debug!(key = %key, "deleted");
        self.decode_node(&node)
    }

    /// Every live object in the context namespace, ordered by name.
    #[instrument(skip_all, fields(resource = T::RESOURCE))]
    pub async fn list(&self, ctx: &RequestContext) -> RegistryResult<Vec<T>> {
        let namespace = request_namespace(ctx, "")?;
        let prefix = self.keys.namespace_prefix(namespace)?;
        let nodes = ctx
            .run(self.client.list(&prefix))
            .await?
            .map_err(|err| classify::<T>(err, namespace, ""))?;
        nodes.iter().map(|node| self.decode_node(node)).collect()
    }

    async fn create_at(&self, ctx: &RequestContext, key: &str, mut object: T) -> RegistryResult<T> {
        let meta = object.metadata_mut();
        meta.clear_system_fields();
        meta.uid = Uuid::new_v4().to_string();
        meta.creation_timestamp = Some(Utc::now());
        let namespace = meta.namespace.clone();
        let name = meta.name.clone();

        let data = self.codec.encode(&object)?;
        let node = ctx
            .run(self.client.create_if_absent(key, data.into(), self.ttl))
            .await?
            .map_err(|err| classify::<T>(err, &namespace, &name))?;

        debug!(key, index = node.modified_index, "created");
        self.decode_node(&node)
    }

    /// Settle the object's namespace against the request and derive its key.
    fn admit(&self, ctx: &RequestContext, object: &mut T) -> RegistryResult<String> {
        let meta = object.metadata_mut();
        let namespace = request_namespace(ctx, &meta.name)?;

        if meta.namespace.is_empty() {
            meta.namespace = namespace.to_string();
        } else if meta.namespace != namespace {
            return Err(InvalidIdentity {
                namespace: meta.namespace.clone(),
                name: meta.name.clone(),
                reason: format!("does not match the request namespace {namespace:?}"),
            }
            .into());
        }

        Ok(self.keys.key_for(&meta.namespace, &meta.name)?)
    }

    fn decode_node(&self, node: &StoreNode) -> RegistryResult<T> {
        let mut object = self.codec.decode(&node.value)?;
        object.metadata_mut().resource_version = node.modified_index.to_string();
        Ok(object)
    }
}

fn request_namespace<'a>(ctx: &'a RequestContext, name: &str) -> RegistryResult<&'a str> {
    ctx.namespace().ok_or_else(|| {
        InvalidIdentity {
            namespace: String::new(),
            name: name.to_string(),
            reason: "namespace parameter required".to_string(),
        }
        .into()
    })
}

/// Empty and `"0"` both mean the caller has no version to check against.
fn parse_resource_version(version: &str) -> RegistryResult<Option<u64>> {
    if version.is_empty() {
        return Ok(None);
    }
    match version.parse::<u64>() {
        Ok(0) => Ok(None),
        Ok(index) => Ok(Some(index)),
        Err(_) => Err(RegistryError::InvalidResourceVersion(version.to_string())),
    }
}

fn conflict<T: Resource>(namespace: &str, name: &str, reason: String) -> RegistryError {
    RegistryError::Conflict {
        resource: T::RESOURCE,
        namespace: namespace.to_string(),
        name: name.to_string(),
        reason,
    }
}

fn classify<T: Resource>(err: StoreError, namespace: &str, name: &str) -> RegistryError {
    match err {
        StoreError::AlreadyExists { .. } => RegistryError::AlreadyExists {
            resource: T::RESOURCE,
            namespace: namespace.to_string(),
            name: name.to_string(),
        },
        StoreError::NotFound { .. } => RegistryError::NotFound {
            resource: T::RESOURCE,
            namespace: namespace.to_string(),
            name: name.to_string(),
        },
        StoreError::VersionConflict { expected, .. } => conflict::<T>(
            namespace,
            name,
            format!("resourceVersion {expected} is no longer current"),
        ),
        StoreError::Unavailable(reason) => {
            warn!(namespace, name, %reason, "store call failed");
            RegistryError::StorageUnavailable(reason)
        }
    }
}
