pub mod config;
pub mod http;
pub mod registry;
pub mod storage;

pub use config::RegistryConfig;
pub use registry::{EventStorage, RegistryError, RequestContext, StorageOptions, new_event_storage};
pub use storage::{MemoryStore, ObjectStoreClient, StoreClient};
