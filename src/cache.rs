//! Short-lived lookup cache invalidated purely by time-to-live

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Read-mostly cache whose entries expire `ttl` after insertion
///
/// The lock is only held for map access, never across an await point.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, (Instant, V)>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        debug!(?ttl, "TtlCache::new: called");
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fetch a live entry; expired entries are evicted on the way
    pub fn get(&self, key: &K) -> Option<V> {
        let Ok(mut entries) = self.entries.lock() else {
            debug!("TtlCache::get: lock poisoned, treating as miss");
            return None;
        };

        match entries.get(key) {
            Some((inserted, value)) if inserted.elapsed() < self.ttl => return Some(value.clone()),
            Some(_) => {}
            None => return None,
        }

        entries.remove(key);
        None
    }

    /// Store `value`, sweeping expired entries first so the map only holds
    /// keys seen within the last `ttl`
    pub fn insert(&self, key: K, value: V) {
        if let Ok(mut entries) = self.entries.lock() {
            let ttl = self.ttl;
            entries.retain(|_, (inserted, _)| inserted.elapsed() < ttl);
            entries.insert(key, (Instant::now(), value));
        } else {
            debug!("TtlCache::insert: lock poisoned, dropping entry");
        }
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let Ok(mut entries) = self.entries.lock() else {
            return 0;
        };
        let before = entries.len();
        entries.retain(|_, (inserted, _)| inserted.elapsed() < self.ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
