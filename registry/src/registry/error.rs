use thiserror::Error;

use crate::storage::{CodecError, InvalidIdentity};

use super::context::DeadlineExceeded;

/// Everything a registry call can fail with.
///
/// `AlreadyExists` and `Conflict` mean re-read and retry, `StorageUnavailable`
/// means back off and retry (the write may or may not have applied), and
/// `InvalidIdentity`/`InvalidResourceVersion` mean the request must change.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error(transparent)]
    InvalidIdentity(#[from] InvalidIdentity),

    #[error("Invalid resourceVersion {0:?}: must be an unsigned integer")]
    InvalidResourceVersion(String),

    #[error("{resource} \"{namespace}/{name}\" already exists")]
    AlreadyExists {
        resource: &'static str,
        namespace: String,
        name: String,
    },

    #[error("{resource} \"{namespace}/{name}\" was modified concurrently: {reason}")]
    Conflict {
        resource: &'static str,
        namespace: String,
        name: String,
        reason: String,
    },

    #[error("{resource} \"{namespace}/{name}\" not found")]
    NotFound {
        resource: &'static str,
        namespace: String,
        name: String,
    },

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl RegistryError {
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }

    pub fn is_invalid(&self) -> bool {
        matches!(
            self,
            Self::InvalidIdentity(_) | Self::InvalidResourceVersion(_)
        )
    }
}

impl From<DeadlineExceeded> for RegistryError {
    fn from(err: DeadlineExceeded) -> Self {
        Self::StorageUnavailable(err.to_string())
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;
