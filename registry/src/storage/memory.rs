//! Deterministic in-memory [`StoreClient`] for tests and local runs.
//!
//! Indices come from one store-wide counter, so every successful write gets
//! a strictly larger `modified_index` than any write before it. Failures can
//! be queued per operation, and the store clock can be moved forward to
//! drive TTL expiry without sleeping.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use super::error::StoreError;
use super::metadata::NodeHeader;
use super::traits::{StoreClient, StoreNode};

/// Store operations that can have failures injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Get,
    CreateIfAbsent,
    CompareAndSwap,
    Delete,
    List,
}

#[derive(Debug)]
struct Entry {
    header: NodeHeader,
    value: Bytes,
}

#[derive(Debug)]
struct Inner {
    nodes: BTreeMap<String, Entry>,
    index: u64,
    failures: HashMap<StoreOp, VecDeque<StoreError>>,
    clock_skew: chrono::Duration,
}

impl Inner {
    fn now(&self) -> DateTime<Utc> {
        Utc::now() + self.clock_skew
    }

    fn next_index(&mut self) -> u64 {
        self.index += 1;
        self.index
    }

    fn injected(&mut self, op: StoreOp) -> Result<(), StoreError> {
        match self.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => {
                debug!(?op, %err, "returning injected failure");
                Err(err)
            }
            None => Ok(()),
        }
    }

    /// Live entry at `key`, dropping it first if it has expired.
    fn live(&mut self, key: &str, now: DateTime<Utc>) -> Option<&Entry> {
        if self
            .nodes
            .get(key)
            .is_some_and(|entry| entry.header.is_expired(now))
        {
            debug!(key, "expiring node");
            self.nodes.remove(key);
        }
        self.nodes.get(key)
    }

    fn put(&mut self, header: NodeHeader, value: Bytes, now: DateTime<Utc>) -> StoreNode {
        let node = header.to_node(value.clone(), now);
        self.nodes
            .insert(header.key.clone(), Entry { header, value });
        node
    }
}

#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                nodes: BTreeMap::new(),
                index: 0,
                failures: HashMap::new(),
                clock_skew: chrono::Duration::zero(),
            }),
        }
    }

    /// Write `value` at `key` unconditionally, as another client would.
    pub async fn seed(
        &self,
        key: &str,
        value: impl Into<Bytes>,
        ttl: Option<Duration>,
    ) -> StoreNode {
        let mut inner = self.inner.lock().await;
        let now = inner.now();
        let index = inner.next_index();
        let header = match inner.live(key, now) {
            Some(entry) => entry.header.modified(index, ttl, now),
            None => NodeHeader::created(key, index, ttl, now),
        };
        inner.put(header, value.into(), now)
    }

    /// Current live node at `key`, bypassing injected failures.
    pub async fn node(&self, key: &str) -> Option<StoreNode> {
        let mut inner = self.inner.lock().await;
        let now = inner.now();
        inner
            .live(key, now)
            .map(|entry| entry.header.to_node(entry.value.clone(), now))
    }

    /// Fail the next call of `op` with `err`. Queued failures fire in order.
    pub async fn fail_next(&self, op: StoreOp, err: StoreError) {
        let mut inner = self.inner.lock().await;
        inner.failures.entry(op).or_default().push_back(err);
    }

    /// Move the store clock forward by `by`.
    pub async fn advance_clock(&self, by: Duration) {
        let mut inner = self.inner.lock().await;
        if let Ok(by) = chrono::Duration::from_std(by) {
            inner.clock_skew = inner.clock_skew + by;
        }
    }

    /// Nodes held in memory, including expired ones not yet swept.
    pub async fn stored_count(&self) -> usize {
        self.inner.lock().await.nodes.len()
    }

    /// Index of the most recent write.
    pub async fn current_index(&self) -> u64 {
        self.inner.lock().await.index
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn get(&self, key: &str) -> Result<StoreNode, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.injected(StoreOp::Get)?;
        let now = inner.now();
        inner
            .live(key, now)
            .map(|entry| entry.header.to_node(entry.value.clone(), now))
            .ok_or_else(|| StoreError::NotFound {
                key: key.to_string(),
            })
    }

    async fn create_if_absent(
        &self,
        key: &str,
        value: Bytes,
        ttl: Option<Duration>,
    ) -> Result<StoreNode, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.injected(StoreOp::CreateIfAbsent)?;
        let now = inner.now();

        if inner.live(key, now).is_some() {
            return Err(StoreError::AlreadyExists {
                key: key.to_string(),
            });
        }

        let index = inner.next_index();
        debug!(key, index, "memory store create");
        Ok(inner.put(NodeHeader::created(key, index, ttl, now), value, now))
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        value: Bytes,
        expected_index: u64,
        ttl: Option<Duration>,
    ) -> Result<StoreNode, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.injected(StoreOp::CompareAndSwap)?;
        let now = inner.now();

        let current = match inner.live(key, now) {
            Some(entry) => entry.header.clone(),
            None => {
                return Err(StoreError::NotFound {
                    key: key.to_string(),
                });
            }
        };

        if current.modified_index != expected_index {
            debug!(
                key,
                expected_index,
                actual = current.modified_index,
                "memory store compare failed"
            );
            return Err(StoreError::VersionConflict {
                key: key.to_string(),
                expected: expected_index,
            });
        }

        let index = inner.next_index();
        debug!(key, index, "memory store swap");
        Ok(inner.put(current.modified(index, ttl, now), value, now))
    }

    async fn delete(&self, key: &str) -> Result<StoreNode, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.injected(StoreOp::Delete)?;
        let now = inner.now();

        if inner.live(key, now).is_none() {
            return Err(StoreError::NotFound {
                key: key.to_string(),
            });
        }

        let index = inner.next_index();
        debug!(key, index, "memory store delete");
        let entry = inner.nodes.remove(key).ok_or_else(|| StoreError::NotFound {
            key: key.to_string(),
        })?;
        Ok(entry.header.to_node(entry.value, now))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<StoreNode>, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.injected(StoreOp::List)?;
        let now = inner.now();
        inner.nodes.retain(|_, entry| !entry.header.is_expired(now));

        Ok(inner
            .nodes
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(_, entry)| entry.header.to_node(entry.value.clone(), now))
            .collect())
    }
}
