mod backend;
mod codec;
mod config;
mod error;
mod key;
mod memory;
mod metadata;
mod traits;


pub use backend::ObjectStoreClient;
pub use codec::{Codec, JsonCodec};
pub use config::StoreConfig;
pub use error::{CodecError, InvalidIdentity, StoreError};
pub use key::{DEFAULT_PREFIX, KeyLayout};
pub use memory::{MemoryStore, StoreOp};
pub use traits::{StoreClient, StoreNode};
