/*!
 * Completion caching.
 *
 * A content-addressed cache in front of the chat provider. Entries expire a
 * fixed time after insertion; when the cache is full the least recently used
 * entry is evicted. Locks are only held for the synchronous map access.
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::debug;
use parking_lot::{Mutex, RwLock};

/// Default number of cached completions
pub const DEFAULT_CAPACITY: usize = 100;

/// Default time-to-live of a cached completion
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// One cached completion
#[derive(Debug, Clone)]
struct CacheEntry {
    /// Completion text
    value: String,
    /// When the entry was stored
    inserted_at: Instant,
    /// Access tick of the last read or write
    last_used: u64,
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletionCacheStats {
    /// Lookups answered from the cache
    pub hits: usize,
    /// Lookups that found nothing usable
    pub misses: usize,
    /// Entries currently stored
    pub entries: usize,
}

impl CompletionCacheStats {
    /// Fraction of lookups answered from the cache
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total > 0 {
            self.hits as f64 / total as f64
        } else {
            0.0
        }
    }
}

/// Bounded LRU cache with a hard TTL
#[derive(Debug, Clone)]
pub struct CompletionCache {
    /// Internal cache storage
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    /// Monotonic access counter used for LRU ordering
    tick: Arc<Mutex<u64>>,
    /// Hit and miss counters
    stats: Arc<Mutex<CompletionCacheStats>>,
    /// Maximum number of entries
    capacity: usize,
    /// Lifetime of an entry
    ttl: Duration,
}

impl Default for CompletionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

impl CompletionCache {
    /// Create a cache holding at most `capacity` entries for `ttl` each
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            tick: Arc::new(Mutex::new(0)),
            stats: Arc::new(Mutex::new(CompletionCacheStats::default())),
            capacity: capacity.max(1),
            ttl,
        }
    }

    fn next_tick(&self) -> u64 {
        let mut tick = self.tick.lock();
        *tick += 1;
        *tick
    }

    /// Cached value for `key`, if present and not expired
    pub fn get(&self, key: &str) -> Option<String> {
        let tick = self.next_tick();
        let mut entries = self.entries.write();

        let value = match entries.get_mut(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                entry.last_used = tick;
                Some(entry.value.clone())
            }
            Some(_) => {
                debug!("Completion cache entry expired for {}", short(key));
                entries.remove(key);
                None
            }
            None => None,
        };

        let mut stats = self.stats.lock();
        if value.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        value
    }

    /// Whether a live entry exists for `key`; does not touch LRU order or stats
    pub fn has(&self, key: &str) -> bool {
        self.entries
            .read()
            .get(key)
            .is_some_and(|entry| entry.inserted_at.elapsed() < self.ttl)
    }

    /// Store `value` under `key`, evicting as needed
    pub fn set(&self, key: &str, value: &str) {
        let tick = self.next_tick();
        let mut entries = self.entries.write();

        let ttl = self.ttl;
        entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);

        if !entries.contains_key(key) && entries.len() >= self.capacity {
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(k, _)| k.clone())
            {
                debug!("Evicting least recently used completion {}", short(&oldest));
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                inserted_at: Instant::now(),
                last_used: tick,
            },
        );
    }

    /// Number of stored entries (expired ones included until next write)
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every entry and reset statistics
    pub fn clear(&self) {
        self.entries.write().clear();
        *self.stats.lock() = CompletionCacheStats::default();
    }

    /// Current statistics
    pub fn stats(&self) -> CompletionCacheStats {
        let mut stats = *self.stats.lock();
        stats.entries = self.len();
        stats
    }
}

fn short(key: &str) -> &str {
    &key[..key.len().min(12)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setThenGet_shouldReturnValueAndCountHit() {
        let cache = CompletionCache::default();
        cache.set("k", "v");

        assert_eq!(cache.get("k").as_deref(), Some("v"));
        assert_eq!(cache.get("missing"), None);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_get_afterTtl_shouldMiss() {
        let cache = CompletionCache::new(10, Duration::from_millis(0));
        cache.set("k", "v");

        assert!(!cache.has("k"));
        assert_eq!(cache.get("k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_set_overCapacity_shouldEvictLeastRecentlyUsed() {
        let cache = CompletionCache::new(2, DEFAULT_TTL);
        cache.set("a", "1");
        cache.set("b", "2");
        cache.get("a");

        cache.set("c", "3");

        assert!(cache.has("a"));
        assert!(!cache.has("b"));
        assert!(cache.has("c"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_set_existingKey_shouldReplaceWithoutEviction() {
        let cache = CompletionCache::new(2, DEFAULT_TTL);
        cache.set("a", "1");
        cache.set("b", "2");

        cache.set("a", "updated");

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a").as_deref(), Some("updated"));
    }

    #[test]
    fn test_clones_shouldShareEntries() {
        let cache = CompletionCache::default();
        let clone = cache.clone();

        cache.set("k", "v");
        assert!(clone.has("k"));

        clone.clear();
        assert!(cache.is_empty());
    }
}
