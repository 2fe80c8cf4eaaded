#![forbid(unsafe_code)]

mod file;
mod memory;
mod tree_cache;

pub use file::FileCacheStore;
pub use memory::MemoryCacheStore;
pub use tree_cache::TreeCache;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheStoreError {
    #[error("cache io: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// Durable key/value cache shared between processes. Entries never expire on
/// their own; they live until `forget` or an overwrite.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheStoreError>;

    fn set_forever(&self, key: &str, value: &[u8]) -> Result<(), CacheStoreError>;

    fn forget(&self, key: &str) -> Result<(), CacheStoreError>;
}

impl<T: CacheStore + ?Sized> CacheStore for std::sync::Arc<T> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheStoreError> {
        (**self).get(key)
    }

    fn set_forever(&self, key: &str, value: &[u8]) -> Result<(), CacheStoreError> {
        (**self).set_forever(key, value)
    }

    fn forget(&self, key: &str) -> Result<(), CacheStoreError> {
        (**self).forget(key)
    }
}
