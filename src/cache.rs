// In-process TTL cache.
//
// Entries expire after a per-entry or default TTL; expired entries are
// treated as absent and removed on access. When the cache is full, expired
// entries are evicted first, then the oldest entry by insertion time.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Configuration for a [`TtlCache`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries held at once.
    pub max_entries: usize,

    /// TTL applied by [`TtlCache::insert`]; `None` means entries never
    /// expire unless given an explicit TTL.
    pub default_ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1024,
            default_ttl: Some(Duration::from_secs(300)),
        }
    }
}

/// Metrics about the cache state.
#[derive(Debug, Clone)]
pub struct CacheMetrics {
    pub entries: usize,
    pub max_entries: usize,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    inserted_at: Instant,
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// A bounded map from string keys to values with per-entry expiry.
///
/// All operations take `&self`; the entry map sits behind a mutex, so the
/// cache can be shared across threads behind an `Arc`.
#[derive(Debug)]
pub struct TtlCache<V> {
    config: CacheConfig,
    entries: Mutex<HashMap<String, Entry<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(config: Option<CacheConfig>) -> Self {
        let config = config.unwrap_or_default();
        Self {
            entries: Mutex::new(HashMap::with_capacity(config.max_entries.min(64))),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Insert a value under the default TTL.
    pub fn insert(&self, key: &str, value: V) {
        self.insert_with_ttl(key, value, self.config.default_ttl);
    }

    /// Insert a value with an explicit TTL (`None` = never expires).
    pub fn insert_with_ttl(&self, key: &str, value: V, ttl: Option<Duration>) {
        let now = Instant::now();
        let mut entries = self.lock_entries();
        if !entries.contains_key(key) && entries.len() >= self.config.max_entries {
            Self::make_room(&mut entries, now, self.config.max_entries);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value,
                inserted_at: now,
                expires_at: ttl.map(|t| now + t),
            },
        );
    }

    /// Look a key up. An expired entry counts as a miss and is removed.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.lock_entries();
        let expired = match entries.get(key) {
            Some(entry) if entry.is_live(now) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Remove a key, returning its value if it was present and live.
    pub fn remove(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.lock_entries();
        entries
            .remove(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value)
    }

    /// Drop all expired entries, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock_entries();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    pub fn clear(&self) {
        self.lock_entries().clear();
    }

    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the cache state.
    pub fn metrics(&self) -> CacheMetrics {
        CacheMetrics {
            entries: self.len(),
            max_entries: self.config.max_entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn make_room(entries: &mut HashMap<String, Entry<V>>, now: Instant, max_entries: usize) {
        entries.retain(|_, entry| entry.is_live(now));
        if entries.len() < max_entries || entries.is_empty() {
            return;
        }
        let oldest = entries
            .iter()
            .min_by_key(|(_, entry)| entry.inserted_at)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            entries.remove(&key);
        }
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry<V>>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
