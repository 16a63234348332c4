use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

use super::error::StoreError;

/// One key as the store reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreNode {
    pub key: String,
    pub value: Bytes,
    pub created_index: u64,
    pub modified_index: u64,
    /// Remaining time to live in whole seconds, rounded up
    pub ttl: Option<u64>,
}

/// Client for a hierarchical, linearizable key-value store.
///
/// Every method is a single round trip. Implementations must make
/// `create_if_absent` and `compare_and_swap` atomic per key: of any set of
/// racing writers against one key, at most one succeeds.
///
/// A `ttl` of `None` or zero stores the node without expiry. Expired nodes
/// behave exactly like absent ones.
#[async_trait]
pub trait StoreClient: Send + Sync {
    async fn get(&self, key: &str) -> Result<StoreNode, StoreError>;

    /// Write `value` only if `key` holds nothing.
    ///
    /// # Errors
    /// Returns `StoreError::AlreadyExists` if a live node is present
    async fn create_if_absent(
        &self,
        key: &str,
        value: Bytes,
        ttl: Option<Duration>,
    ) -> Result<StoreNode, StoreError>;

    /// Replace `value` only if the node's modified index is `expected_index`.
    ///
    /// # Errors
    /// Returns `StoreError::VersionConflict` if the node moved on, and
    /// `StoreError::NotFound` if it is gone
    async fn compare_and_swap(
        &self,
        key: &str,
        value: Bytes,
        expected_index: u64,
        ttl: Option<Duration>,
    ) -> Result<StoreNode, StoreError>;

    /// Remove `key`, returning the node as it was.
    ///
    /// Indices are never reused: a node created at `key` afterwards gets a
    /// larger `modified_index` than the removed one.
    ///
    /// # Errors
    /// Returns `StoreError::NotFound` if nothing live is at `key`, and
    /// `StoreError::VersionConflict` if the node changed during the call
    async fn delete(&self, key: &str) -> Result<StoreNode, StoreError>;

    /// Every live node whose key starts with `prefix`, ordered by key.
    async fn list(&self, prefix: &str) -> Result<Vec<StoreNode>, StoreError>;
}
