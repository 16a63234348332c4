mod context;
mod error;
mod rest;


pub use context::{DeadlineExceeded, RequestContext};
pub use error::{RegistryError, RegistryResult};
pub use rest::{
    DEFAULT_EVENT_TTL, EventStorage, StorageOptions, VersionedStore, new_event_storage,
};
