use thiserror::Error;

/// Failures reported by a [`StoreClient`](super::StoreClient).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Key not found: {key}")]
    NotFound { key: String },

    #[error("Key already exists: {key}")]
    AlreadyExists { key: String },

    #[error("Index conflict on {key}: index {expected} is no longer current")]
    VersionConflict { key: String, expected: u64 },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::Unavailable(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Encoding failed: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Decoding failed: {0}")]
    Decode(#[source] serde_json::Error),
}

/// A namespace or name that cannot be mapped onto a store key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid identity {namespace:?}/{name:?}: {reason}")]
pub struct InvalidIdentity {
    pub namespace: String,
    pub name: String,
    pub reason: String,
}
