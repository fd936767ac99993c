// =============================================================================
// SeriesCache — bounded, expiring memo of loaded series
// =============================================================================
//
// Keyed by the exact (symbol, period, interval) tuple. Entries older than the
// TTL are misses and are dropped lazily. When the cache is full the entry with
// the oldest insertion time is evicted. A capacity of zero disables caching.
// =============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::debug;

use crate::market_data::series::OhlcvSeries;
use crate::types::SeriesKey;

struct CacheEntry {
    series: Arc<OhlcvSeries>,
    inserted_at: Instant,
    // Insertion order; `Instant`s can tie on coarse clocks.
    seq: u64,
}

struct Entries {
    map: HashMap<SeriesKey, CacheEntry>,
    next_seq: u64,
}

/// Thread-safe cache shared between the loader and the API layer.
pub struct SeriesCache {
    entries: RwLock<Entries>,
    capacity: usize,
    ttl: Option<Duration>,
}

impl SeriesCache {
    /// `ttl = None` keeps entries until they are evicted or invalidated.
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        Self {
            entries: RwLock::new(Entries {
                map: HashMap::with_capacity(capacity),
                next_seq: 0,
            }),
            capacity,
            ttl,
        }
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        self.ttl
            .map_or(false, |ttl| entry.inserted_at.elapsed() >= ttl)
    }

    /// Return the cached series for `key`, if present and fresh.
    pub fn get(&self, key: &SeriesKey) -> Option<Arc<OhlcvSeries>> {
        {
            let entries = self.entries.read();
            match entries.map.get(key) {
                Some(entry) if !self.is_expired(entry) => {
                    return Some(Arc::clone(&entry.series));
                }
                Some(_) => {}
                None => return None,
            }
        }

        // Expired: drop it so the map does not keep stale series around.
        let mut entries = self.entries.write();
        if entries.map.get(key).map_or(false, |e| self.is_expired(e)) {
            entries.map.remove(key);
            debug!(%key, "cache entry expired");
        }
        None
    }

    /// Store `series` under `key`, evicting the oldest entry when full.
    pub fn insert(&self, key: SeriesKey, series: Arc<OhlcvSeries>) {
        if self.capacity == 0 {
            return;
        }

        let mut entries = self.entries.write();
        if !entries.map.contains_key(&key) {
            entries.map.retain(|_, e| !self.is_expired(e));
            while entries.map.len() >= self.capacity {
                let oldest = entries
                    .map
                    .iter()
                    .min_by_key(|(_, e)| e.seq)
                    .map(|(k, _)| k.clone());
                match oldest {
                    Some(k) => {
                        entries.map.remove(&k);
                        debug!(key = %k, "cache full, evicted oldest entry");
                    }
                    None => break,
                }
            }
        }

        let seq = entries.next_seq;
        entries.next_seq += 1;
        entries.map.insert(
            key,
            CacheEntry {
                series,
                inserted_at: Instant::now(),
                seq,
            },
        );
    }

    /// Drop the entry for `key`. Returns `true` if one was present.
    pub fn invalidate(&self, key: &SeriesKey) -> bool {
        self.entries.write().map.remove(key).is_some()
    }

    /// Drop every entry and return how many were removed.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.write();
        let n = entries.map.len();
        entries.map.clear();
        n
    }

    /// Number of stored entries, including ones that may have expired.
    pub fn len(&self) -> usize {
        self.entries.read().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
