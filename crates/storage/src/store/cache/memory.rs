#![forbid(unsafe_code)]

use super::{CacheStore, CacheStoreError};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// In-process cache store.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheStoreError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set_forever(&self, key: &str, value: &[u8]) -> Result<(), CacheStoreError> {
        self.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn forget(&self, key: &str) -> Result<(), CacheStoreError> {
        self.lock().remove(key);
        Ok(())
    }
}
