//! Time-bounded cache of inferred schema snapshots.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::connection::Namespace;
use crate::schema::SchemaSnapshot;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    namespace: Namespace,
    sample_size: u64,
}

struct CacheEntry {
    snapshot: Arc<SchemaSnapshot>,
    inserted_at: Instant,
}

/// Snapshots keyed by collection and requested sample size.
///
/// Entries expire after the TTL. Callers invalidate explicitly on writes, index
/// changes, drops and renames; the cache never watches the store.
pub struct SnapshotCache {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl SnapshotCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: Mutex::new(HashMap::new()) }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh snapshot for the key, evicting it if expired.
    pub fn get(&self, namespace: &Namespace, sample_size: u64) -> Option<Arc<SchemaSnapshot>> {
        let key = CacheKey { namespace: namespace.clone(), sample_size };
        let mut entries = self.entries.lock();
        match entries.get(&key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                log::debug!("Snapshot cache hit for {namespace} (sample {sample_size})");
                Some(entry.snapshot.clone())
            }
            Some(_) => {
                entries.remove(&key);
                log::debug!("Snapshot cache entry for {namespace} expired");
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, namespace: &Namespace, sample_size: u64, snapshot: Arc<SchemaSnapshot>) {
        let key = CacheKey { namespace: namespace.clone(), sample_size };
        self.entries.lock().insert(key, CacheEntry { snapshot, inserted_at: Instant::now() });
    }

    /// Drop every sample size cached for one collection. Returns the number removed.
    pub fn invalidate_collection(&self, namespace: &Namespace) -> usize {
        self.retain(|key| &key.namespace != namespace)
    }

    /// Drop every collection cached for one database. Returns the number removed.
    pub fn invalidate_database(&self, database: &str) -> usize {
        self.retain(|key| key.namespace.database != database)
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn retain(&self, keep: impl Fn(&CacheKey) -> bool) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|key, _| keep(key));
        let removed = before - entries.len();
        if removed > 0 {
            log::debug!("Invalidated {removed} cached snapshot(s)");
        }
        removed
    }
}
