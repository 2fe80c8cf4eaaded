#![forbid(unsafe_code)]

use ct_core::{CategoryId, RelatedModel};
use ct_storage::{
    CacheStore, CacheStoreError, CategoryTree, CreateCategoryRequest, FileCacheStore,
    MemoryCacheStore, SqliteStore, StoreError, StoreOptions, TreeCache,
};
use rusqlite::{Connection, params};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const KEY: &str = "category_tree";

fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let dir = base.join(format!("ct_storage_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn open_tree_with<C: CacheStore>(storage_dir: &Path, durable: C) -> CategoryTree<C> {
    let store = SqliteStore::open(storage_dir).expect("open store");
    CategoryTree::with_cache(store, Arc::new(TreeCache::new(durable, KEY)))
}

fn tag(value: &str) -> Option<RelatedModel> {
    Some(RelatedModel::try_new(value).expect("related model"))
}

/// Counts `forget` calls on top of an in-memory store.
#[derive(Default)]
struct CountingCacheStore {
    inner: MemoryCacheStore,
    forgets: AtomicUsize,
}

impl CacheStore for CountingCacheStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheStoreError> {
        self.inner.get(key)
    }

    fn set_forever(&self, key: &str, value: &[u8]) -> Result<(), CacheStoreError> {
        self.inner.set_forever(key, value)
    }

    fn forget(&self, key: &str) -> Result<(), CacheStoreError> {
        self.forgets.fetch_add(1, Ordering::SeqCst);
        self.inner.forget(key)
    }
}

/// Every operation fails.
struct BrokenCacheStore;

impl CacheStore for BrokenCacheStore {
    fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheStoreError> {
        Err(CacheStoreError::Unavailable("down".to_string()))
    }

    fn set_forever(&self, _key: &str, _value: &[u8]) -> Result<(), CacheStoreError> {
        Err(CacheStoreError::Unavailable("down".to_string()))
    }

    fn forget(&self, _key: &str) -> Result<(), CacheStoreError> {
        Err(CacheStoreError::Unavailable("down".to_string()))
    }
}

/// Reads and writes work, `forget` fails and leaves the entry in place.
#[derive(Default)]
struct StickyCacheStore {
    inner: MemoryCacheStore,
}

impl CacheStore for StickyCacheStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheStoreError> {
        self.inner.get(key)
    }

    fn set_forever(&self, key: &str, value: &[u8]) -> Result<(), CacheStoreError> {
        self.inner.set_forever(key, value)
    }

    fn forget(&self, _key: &str) -> Result<(), CacheStoreError> {
        Err(CacheStoreError::Unavailable("read-only".to_string()))
    }
}

#[test]
fn every_mutation_invalidates_exactly_once() {
    let storage_dir = temp_dir("every_mutation_invalidates_exactly_once");
    let mut tree = open_tree_with(&storage_dir, CountingCacheStore::default());
    let forgets = |tree: &CategoryTree<CountingCacheStore>| {
        tree.cache().durable().forgets.load(Ordering::SeqCst)
    };

    let root = tree.create_root("Root", tag("Product")).expect("root");
    assert_eq!(forgets(&tree), 1);
    let child = tree.create(CreateCategoryRequest::child("Child", root.id)).expect("child");
    assert_eq!(forgets(&tree), 2);
    let other = tree.create_root("Other", tag("Product")).expect("other");
    assert_eq!(forgets(&tree), 3);
    tree.append(other.id, child.id).expect("append");
    assert_eq!(forgets(&tree), 4);
    tree.remove(child.id).expect("remove");
    assert_eq!(forgets(&tree), 5);
    assert_eq!(tree.cache().generation(), 5);

    tree.remove(CategoryId::new(1234)).expect_err("unknown id");
    tree.append(root.id, root.id).expect_err("self");
    assert_eq!(forgets(&tree), 5, "failed mutations leave the cache alone");
}

#[test]
fn reads_are_served_from_memory_until_invalidated() {
    let storage_dir = temp_dir("reads_are_served_from_memory_until_invalidated");
    let mut tree = open_tree_with(&storage_dir, MemoryCacheStore::new());
    let root = tree.create_root("Root", None).expect("root");
    assert!(!tree.cache().is_warm());

    let first = tree.snapshot().expect("snapshot");
    assert!(tree.cache().is_warm());
    assert!(tree.cache().durable().contains(KEY));
    let second = tree.snapshot().expect("snapshot");
    assert!(Arc::ptr_eq(&first, &second));

    tree.create(CreateCategoryRequest::child("Child", root.id)).expect("child");
    assert!(!tree.cache().is_warm());
    assert!(!tree.cache().durable().contains(KEY));

    let rebuilt = tree.snapshot().expect("snapshot");
    assert!(!Arc::ptr_eq(&first, &rebuilt));
    assert_eq!(rebuilt.node(root.id).expect("root").child_count(), 1);
}

#[test]
fn fresh_process_reads_durable_entry() {
    let storage_dir = temp_dir("fresh_process_reads_durable_entry");
    let durable = Arc::new(MemoryCacheStore::new());
    let mut tree = open_tree_with(&storage_dir, Arc::clone(&durable));
    let root = tree.create_root("Root", None).expect("root");
    tree.snapshot().expect("warm cache");

    // A row written behind the cache's back stays invisible while the
    // durable entry lives.
    let conn = Connection::open(tree.store().options().db_path()).expect("open db");
    conn.execute(
        "INSERT INTO categories(parent_id, name, created_at, updated_at) VALUES (0, 'Hidden', 0, 0)",
        params![],
    )
    .expect("insert");

    let other = open_tree_with(&storage_dir, Arc::clone(&durable));
    let snapshot = other.snapshot().expect("snapshot");
    assert_eq!(snapshot.len(), 1);
    assert!(snapshot.contains(root.id));
    assert!(other.cache().is_warm());

    other.clear_cache();
    assert_eq!(other.snapshot().expect("rebuilt").len(), 2);
}

#[test]
fn corrupt_durable_entry_is_rebuilt() {
    let storage_dir = temp_dir("corrupt_durable_entry_is_rebuilt");
    let durable = Arc::new(MemoryCacheStore::new());
    let mut tree = open_tree_with(&storage_dir, Arc::clone(&durable));
    let root = tree.create_root("Root", None).expect("root");

    durable.set_forever(KEY, b"{not a tree").expect("seed garbage");
    let trees = tree.top_level_trees().expect("top level");
    assert_eq!(trees.len(), 1);
    assert_eq!(trees[0].id, root.id);

    let repaired = durable.get(KEY).expect("get").expect("entry rewritten");
    assert_ne!(repaired, b"{not a tree".to_vec());
}

#[test]
fn broken_cache_store_never_fails_reads_or_writes() {
    let storage_dir = temp_dir("broken_cache_store_never_fails_reads_or_writes");
    let mut tree = open_tree_with(&storage_dir, BrokenCacheStore);

    let root = tree.create_root("Root", None).expect("root");
    let child = tree.create(CreateCategoryRequest::child("Child", root.id)).expect("child");
    let subtree = tree.subtree(root.id).expect("subtree");
    assert_eq!(subtree.children[0].id, child.id);
    assert!(tree.cache().is_warm());
}

#[test]
fn failed_forget_bypasses_stale_durable_entry() {
    let storage_dir = temp_dir("failed_forget_bypasses_stale_durable_entry");
    let mut tree = open_tree_with(&storage_dir, StickyCacheStore::default());
    let root = tree.create_root("Root", None).expect("root");
    tree.snapshot().expect("warm cache");
    assert!(tree.cache().durable().inner.contains(KEY));

    let child = tree.create(CreateCategoryRequest::child("Child", root.id)).expect("child");
    assert!(tree.cache().durable().inner.contains(KEY), "forget failed");

    let snapshot = tree.snapshot().expect("snapshot");
    assert!(snapshot.contains(child.id), "stale durable entry was not used");
}

#[test]
fn rebuild_racing_an_invalidation_is_not_published() {
    let storage_dir = temp_dir("rebuild_racing_an_invalidation_is_not_published");
    let store = SqliteStore::open(&storage_dir).expect("open store");
    let cache = TreeCache::new(MemoryCacheStore::new(), KEY);

    let snapshot = cache
        .get_or_build(|| {
            let categories = store.categories();
            cache.invalidate();
            categories
        })
        .expect("rebuild");
    assert!(snapshot.is_empty());
    assert!(!cache.is_warm());
    assert!(!cache.durable().contains(KEY));
    assert_eq!(cache.generation(), 1);
}

#[test]
fn loader_errors_reach_the_caller() {
    let cache = TreeCache::new(MemoryCacheStore::new(), KEY);
    let err = cache
        .get_or_build(|| Err(StoreError::InvalidInput("store offline")))
        .expect_err("loader failure");
    assert!(matches!(err, StoreError::InvalidInput("store offline")));
    assert!(!cache.is_warm());
}

#[test]
fn unknown_subtree_is_not_found() {
    let storage_dir = temp_dir("unknown_subtree_is_not_found");
    let tree = open_tree_with(&storage_dir, MemoryCacheStore::new());
    let err = tree.subtree(CategoryId::new(5)).expect_err("missing");
    assert!(matches!(err, StoreError::NotFound(id) if id == CategoryId::new(5)));
}

#[test]
fn serialized_tree_matches_parent_ids() {
    let storage_dir = temp_dir("serialized_tree_matches_parent_ids");
    let mut tree = open_tree_with(&storage_dir, MemoryCacheStore::new());
    let a = tree.create_root("A", tag("Product")).expect("a");
    let b = tree.create(CreateCategoryRequest::child("B", a.id)).expect("b");
    tree.create(CreateCategoryRequest::child("C", b.id)).expect("c");
    tree.create(CreateCategoryRequest::child("D", a.id)).expect("d");
    let e = tree.create_root("E", tag("Product")).expect("e");
    tree.append(e.id, b.id).expect("move");
    tree.create_root("F", None).expect("f");

    let mut edges = BTreeSet::new();
    let mut stack = tree.top_level_trees().expect("trees");
    while let Some(node) = stack.pop() {
        edges.insert((node.id, node.parent_id));
        stack.extend(node.children);
    }

    let expected: BTreeSet<_> = tree
        .store()
        .categories()
        .expect("categories")
        .into_iter()
        .map(|category| (category.id, category.parent()))
        .collect();
    assert_eq!(edges, expected);

    let json: serde_json::Value =
        serde_json::from_str(&tree.subtree(e.id).expect("e").to_json().expect("json"))
            .expect("parse");
    assert!(json["parent_id"].is_null());
    assert_eq!(json["children"][0]["name"], "B");
    assert_eq!(json["children"][0]["parent_id"], e.id.get());
}

#[test]
fn file_cache_mirrors_and_drops_entry() {
    let storage_dir = temp_dir("file_cache_mirrors_and_drops_entry");
    let options = StoreOptions::new(&storage_dir).with_cache_key("LDING_CATEGORY_TREE");
    let entry = options.cache_dir().join("LDING_CATEGORY_TREE.cache");
    let mut tree = CategoryTree::open(options).expect("open tree");

    let root = tree.create_root("Root", None).expect("root");
    tree.snapshot().expect("snapshot");
    assert!(entry.exists());

    tree.create(CreateCategoryRequest::child("Child", root.id)).expect("child");
    assert!(!entry.exists());
    assert_eq!(tree.subtree(root.id).expect("subtree").node_count(), 2);
    assert!(entry.exists());
}

#[test]
fn handles_opened_on_one_dir_share_the_snapshot() {
    let storage_dir = temp_dir("handles_opened_on_one_dir_share_the_snapshot");
    let mut first = CategoryTree::open(StoreOptions::new(&storage_dir)).expect("open first");
    // Same directory, different spelling.
    let second =
        CategoryTree::open(StoreOptions::new(storage_dir.join("."))).expect("open second");
    assert!(Arc::ptr_eq(first.cache(), second.cache()));

    first.create_root("First", None).expect("first root");
    assert_eq!(second.top_level_trees().expect("second trees").len(), 1);

    first.create_root("Second", None).expect("second root");
    assert_eq!(first.top_level_trees().expect("first trees").len(), 2);
    assert_eq!(second.top_level_trees().expect("second trees").len(), 2);

    let other_key = CategoryTree::open(StoreOptions::new(&storage_dir).with_cache_key("other"))
        .expect("open other key");
    assert!(!Arc::ptr_eq(first.cache(), other_key.cache()));
}

#[test]
fn concurrent_file_writes_never_tear_the_entry() {
    let storage_dir = temp_dir("concurrent_file_writes_never_tear_the_entry");
    let store = Arc::new(FileCacheStore::new(storage_dir.join("cache")));
    let payloads: Vec<Vec<u8>> = (0..4u8).map(|seed| vec![seed; 64 * 1024]).collect();

    std::thread::scope(|scope| {
        for payload in &payloads {
            let store = Arc::clone(&store);
            scope.spawn(move || {
                for _ in 0..20 {
                    store.set_forever(KEY, payload).expect("write entry");
                }
            });
        }
    });

    let entry = store.get(KEY).expect("read entry").expect("entry present");
    assert!(payloads.contains(&entry));
    let leftovers = std::fs::read_dir(store.dir())
        .expect("list cache dir")
        .map(|item| item.expect("dir entry").path())
        .filter(|path| *path != store.entry_path(KEY))
        .count();
    assert_eq!(leftovers, 0, "temp files are renamed into place");
}
