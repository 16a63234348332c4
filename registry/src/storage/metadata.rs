//! Per-node bookkeeping persisted alongside each value.
//!
//! An object written by [`ObjectStoreClient`](super::ObjectStoreClient) is a
//! single line of JSON header followed by the raw value bytes. A deleted
//! node leaves a tombstone header behind so its indices are never reused.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::StoreError;
use super::traits::StoreNode;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeHeader {
    pub key: String,
    pub created_index: u64,
    pub modified_index: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
}

impl NodeHeader {
    /// Header for a fresh node whose first index is `index`.
    pub fn created(key: &str, index: u64, ttl: Option<Duration>, now: DateTime<Utc>) -> Self {
        Self {
            key: key.to_string(),
            created_index: index,
            modified_index: index,
            expires_at: expiry_for(now, ttl),
            deleted: false,
        }
    }

    /// Header for the next write to this node, stamped with `index`.
    pub fn modified(&self, index: u64, ttl: Option<Duration>, now: DateTime<Utc>) -> Self {
        Self {
            key: self.key.clone(),
            created_index: self.created_index,
            modified_index: index,
            expires_at: expiry_for(now, ttl),
            deleted: false,
        }
    }

    /// Marker left in place of a deleted node; keeps its indices.
    pub fn tombstone(&self) -> Self {
        Self {
            key: self.key.clone(),
            created_index: self.created_index,
            modified_index: self.modified_index,
            expires_at: None,
            deleted: true,
        }
    }

    /// Neither deleted nor expired at `now`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.deleted && !self.is_expired(now)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    pub fn to_node(&self, value: Bytes, now: DateTime<Utc>) -> StoreNode {
        StoreNode {
            key: self.key.clone(),
            value,
            created_index: self.created_index,
            modified_index: self.modified_index,
            ttl: remaining_ttl(self.expires_at, now),
        }
    }

    pub fn frame(&self, value: &[u8]) -> Result<Vec<u8>, StoreError> {
        let mut framed = serde_json::to_vec(self).map_err(StoreError::unavailable)?;
        framed.push(b'\n');
        framed.extend_from_slice(value);
        Ok(framed)
    }

    pub fn unframe(raw: Bytes) -> Result<(Self, Bytes), StoreError> {
        let split = raw
            .iter()
            .position(|b| *b == b'\n')
            .ok_or_else(|| StoreError::Unavailable("stored object has no node header".into()))?;
        let header: Self = serde_json::from_slice(&raw[..split]).map_err(StoreError::unavailable)?;
        Ok((header, raw.slice(split + 1..)))
    }
}

/// Absolute expiry for a write made at `now`; zero means no expiry.
pub fn expiry_for(now: DateTime<Utc>, ttl: Option<Duration>) -> Option<DateTime<Utc>> {
    let ttl = ttl.filter(|ttl| !ttl.is_zero())?;
    let ttl = chrono::Duration::from_std(ttl).ok()?;
    now.checked_add_signed(ttl)
}

pub fn remaining_ttl(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<u64> {
    let left = expires_at?.signed_duration_since(now).num_milliseconds();
    Some(u64::try_from(left).unwrap_or(0).div_ceil(1000))
}
