#![forbid(unsafe_code)]

use super::{
    CacheStore, CreateCategoryRequest, FileCacheStore, SqliteStore, StoreError, StoreOptions,
    TreeCache,
};
use ct_core::tree::{SerializedNode, TreeSnapshot};
use ct_core::{Category, CategoryId, RelatedModel};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock, PoisonError, Weak};

type FileTreeCache = TreeCache<FileCacheStore>;

// Live file-backed caches by `(cache dir, cache key)`.
static FILE_CACHES: OnceLock<Mutex<HashMap<(PathBuf, String), Weak<FileTreeCache>>>> =
    OnceLock::new();

/// Returns the cache every `open` handle on this directory and key shares, so
/// that one handle's invalidation drops the snapshot the others serve.
fn shared_file_cache(cache_dir: PathBuf, key: &str) -> Arc<FileTreeCache> {
    let mut caches = FILE_CACHES
        .get_or_init(Mutex::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    caches.retain(|_, cache| cache.strong_count() > 0);

    let slot = (cache_dir, key.to_string());
    if let Some(cache) = caches.get(&slot).and_then(Weak::upgrade) {
        return cache;
    }
    let cache = Arc::new(TreeCache::new(FileCacheStore::new(&slot.0), key));
    caches.insert(slot, Arc::downgrade(&cache));
    cache
}

/// Category store plus tree cache. All writes go through here so that each
/// committed mutation drops the cached tree exactly once.
///
/// Several handles (one connection each) may share a single cache through
/// [`CategoryTree::with_cache`].
#[derive(Debug)]
pub struct CategoryTree<C: CacheStore> {
    store: SqliteStore,
    cache: Arc<TreeCache<C>>,
}

impl CategoryTree<FileCacheStore> {
    /// Opens the store and a file-backed cache under `<storage_dir>/cache`.
    /// Handles opened on the same directory and cache key share one
    /// in-memory snapshot.
    pub fn open(options: StoreOptions) -> Result<Self, StoreError> {
        let store = SqliteStore::open_with(options)?;
        let cache_dir = store.options().canonical_cache_dir()?;
        let cache = shared_file_cache(cache_dir, &store.options().cache_key);
        Ok(Self { store, cache })
    }
}

impl<C: CacheStore> CategoryTree<C> {
    pub fn with_cache(store: SqliteStore, cache: Arc<TreeCache<C>>) -> Self {
        Self { store, cache }
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    pub fn cache(&self) -> &Arc<TreeCache<C>> {
        &self.cache
    }

    pub fn create(&mut self, request: CreateCategoryRequest) -> Result<Category, StoreError> {
        let category = self.store.create_category(request)?;
        self.cache.invalidate();
        Ok(category)
    }

    pub fn create_root(
        &mut self,
        name: impl Into<String>,
        related_model: Option<RelatedModel>,
    ) -> Result<Category, StoreError> {
        self.create(CreateCategoryRequest::root(name, related_model))
    }

    /// Moves `category` and its whole subtree under `target`. Appending under
    /// the root sentinel makes `category` top-level.
    pub fn append(&mut self, target: CategoryId, category: CategoryId) -> Result<(), StoreError> {
        self.store.append_category(target, category)?;
        self.cache.invalidate();
        Ok(())
    }

    pub fn move_to_root(&mut self, category: CategoryId) -> Result<(), StoreError> {
        self.store.move_category_to_root(category)?;
        self.cache.invalidate();
        Ok(())
    }

    /// Deletes a childless category together with its closure rows.
    pub fn remove(&mut self, category: CategoryId) -> Result<(), StoreError> {
        self.store.remove_category(category)?;
        self.cache.invalidate();
        Ok(())
    }

    pub fn snapshot(&self) -> Result<Arc<TreeSnapshot>, StoreError> {
        self.cache.get_or_build(|| self.store.categories())
    }

    pub fn subtree(&self, id: CategoryId) -> Result<SerializedNode, StoreError> {
        Ok(self.snapshot()?.serialize_subtree(id)?)
    }

    pub fn top_level_trees(&self) -> Result<Vec<SerializedNode>, StoreError> {
        Ok(self.snapshot()?.serialize_top_level())
    }

    pub fn clear_cache(&self) {
        self.cache.invalidate();
    }
}
