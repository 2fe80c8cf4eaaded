#![forbid(unsafe_code)]

use super::CacheStore;
use crate::store::StoreError;
use ct_core::Category;
use ct_core::tree::TreeSnapshot;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct CacheSlot {
    generation: u64,
    snapshot: Option<Arc<TreeSnapshot>>,
    // Set when a durable `forget` failed: the entry may be stale, so reads
    // bypass it until a rebuild overwrites it.
    durable_suspect: bool,
}

/// Two-layer cache of the category tree: one snapshot in process memory,
/// mirrored to a durable [`CacheStore`] under a fixed key.
///
/// Invalidation bumps a generation counter and drops both layers. A rebuild
/// only publishes its result if no invalidation happened while it was reading
/// the store.
#[derive(Debug)]
pub struct TreeCache<C> {
    durable: C,
    key: String,
    slot: Mutex<CacheSlot>,
}

impl<C: CacheStore> TreeCache<C> {
    pub fn new(durable: C, key: impl Into<String>) -> Self {
        Self {
            durable,
            key: key.into(),
            slot: Mutex::new(CacheSlot::default()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn durable(&self) -> &C {
        &self.durable
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// True while a snapshot is held in process memory.
    pub fn is_warm(&self) -> bool {
        self.lock().snapshot.is_some()
    }

    pub fn get_or_build<F>(&self, load: F) -> Result<Arc<TreeSnapshot>, StoreError>
    where
        F: FnOnce() -> Result<Vec<Category>, StoreError>,
    {
        let (generation, skip_durable) = {
            let slot = self.lock();
            if let Some(snapshot) = slot.snapshot.as_ref() {
                return Ok(Arc::clone(snapshot));
            }
            (slot.generation, slot.durable_suspect)
        };

        if !skip_durable && let Some(snapshot) = self.read_durable() {
            let snapshot = Arc::new(snapshot);
            let mut slot = self.lock();
            if slot.generation == generation {
                slot.snapshot = Some(Arc::clone(&snapshot));
                debug!(generation, key = %self.key, "tree cache loaded from durable store");
            }
            return Ok(snapshot);
        }

        let categories = load()?;
        let snapshot = Arc::new(TreeSnapshot::build(&categories));
        if !snapshot.orphans().is_empty() {
            warn!(
                orphans = ?snapshot.orphans(),
                "categories with unresolvable parents served as top-level"
            );
        }
        let encoded = match snapshot.encode() {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                warn!(error = %err, "tree snapshot encode failed");
                None
            }
        };

        let mut slot = self.lock();
        if slot.generation != generation {
            debug!(
                started = generation,
                current = slot.generation,
                "discarding stale tree rebuild"
            );
            return Ok(snapshot);
        }
        if let Some(bytes) = encoded {
            match self.durable.set_forever(&self.key, &bytes) {
                Ok(()) => slot.durable_suspect = false,
                Err(err) => warn!(error = %err, key = %self.key, "tree cache durable write failed"),
            }
        }
        slot.snapshot = Some(Arc::clone(&snapshot));
        debug!(generation, nodes = snapshot.len(), "tree cache rebuilt");
        Ok(snapshot)
    }

    /// Drops the in-memory snapshot and the durable entry.
    pub fn invalidate(&self) {
        let mut slot = self.lock();
        slot.generation += 1;
        slot.snapshot = None;
        match self.durable.forget(&self.key) {
            Ok(()) => slot.durable_suspect = false,
            Err(err) => {
                warn!(error = %err, key = %self.key, "tree cache durable forget failed");
                slot.durable_suspect = true;
            }
        }
        debug!(generation = slot.generation, "tree cache invalidated");
    }

    fn read_durable(&self) -> Option<TreeSnapshot> {
        let bytes = match self.durable.get(&self.key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(err) => {
                warn!(error = %err, key = %self.key, "tree cache durable read failed");
                return None;
            }
        };
        match TreeSnapshot::decode(&bytes) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                warn!(error = %err, key = %self.key, "ignoring undecodable tree cache entry");
                None
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
