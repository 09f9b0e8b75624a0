//! Response Cache — spec §4.8.
//!
//! Grounded directly on `validator_cache.rs`'s `RwLock<HashMap<K, Arc<V>>>`
//! double-checked-locking cache, generalized from compiled JSON Schema
//! validators to arbitrary cached RPC responses. Entries expire on TTL;
//! the canonical key never includes caller identity (spec §3 invariant:
//! "the cache is shared across callers for the same operation and
//! parameters"), so it is built from `(operation, logical-key, sorted
//! parameters)` by the caller, not by this module.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tracing::debug;

struct Entry<V> {
    value: Arc<V>,
    inserted_at: Instant,
    ttl: Duration,
}

impl<V> Entry<V> {
    fn is_fresh(&self) -> bool {
        self.inserted_at.elapsed() < self.ttl
    }
}

/// Observability counters, in the spirit of the teacher's
/// `cache_hits`/`cache_misses`/`cache_evictions` atomics.
#[derive(Default)]
pub struct CacheMetrics {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub evictions: AtomicU64,
}

/// A TTL'd, caller-identity-blind cache of arbitrary response values.
#[derive(Clone)]
pub struct ResponseCache<V> {
    entries: Arc<RwLock<HashMap<String, Entry<V>>>>,
    metrics: Arc<CacheMetrics>,
}

impl<V> Default for ResponseCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> ResponseCache<V> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            metrics: Arc::new(CacheMetrics::default()),
        }
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Build the canonical cache key per spec §4.8: `<operation>::<logical-key>::<sorted params>`.
    /// `params` is consumed as `(name, value)` pairs and sorted by name so that
    /// argument order never fragments the cache.
    pub fn canonical_key(operation: &str, logical_key: &str, mut params: Vec<(String, String)>) -> String {
        params.sort_by(|a, b| a.0.cmp(&b.0));
        let joined = params
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("{operation}::{logical_key}::{joined}")
    }

    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        #[allow(clippy::unwrap_used)]
        let fresh = {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            entries.get(key).filter(|e| e.is_fresh()).map(|e| Arc::clone(&e.value))
        };
        if fresh.is_some() {
            self.metrics.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.metrics.misses.fetch_add(1, Ordering::Relaxed);
        }
        fresh
    }

    /// Insert or overwrite `key`. Last writer wins (spec §3 invariant 3):
    /// a concurrent insert for the same key simply replaces whichever
    /// entry is currently stored, with no merge or version check.
    pub fn put(&self, key: String, value: V, ttl: Duration) {
        #[allow(clippy::unwrap_used)]
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            key,
            Entry {
                value: Arc::new(value),
                inserted_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Drop expired entries. Not required for correctness (stale entries are
    /// simply never served by `get`), but bounds memory growth the way a
    /// background sweep would in the teacher's longer-running caches.
    pub fn sweep_expired(&self) {
        #[allow(clippy::unwrap_used)]
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, e| e.is_fresh());
        let evicted = before - entries.len();
        if evicted > 0 {
            self.metrics.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
            debug!(evicted, "response cache swept expired entries");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_then_hit_after_put() {
        let cache: ResponseCache<String> = ResponseCache::new();
        assert!(cache.get("k").is_none());
        cache.put("k".to_string(), "v".to_string(), Duration::from_secs(60));
        assert_eq!(cache.get("k").map(|v| (*v).clone()), Some("v".to_string()));
    }

    #[test]
    fn entry_expires_after_ttl() {
        let cache: ResponseCache<u32> = ResponseCache::new();
        cache.put("k".to_string(), 7, Duration::from_millis(10));
        assert_eq!(cache.get("k").map(|v| *v), Some(7));
        std::thread::sleep(Duration::from_millis(25));
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn last_writer_wins_on_overwrite() {
        let cache: ResponseCache<u32> = ResponseCache::new();
        cache.put("k".to_string(), 1, Duration::from_secs(60));
        cache.put("k".to_string(), 2, Duration::from_secs(60));
        assert_eq!(cache.get("k").map(|v| *v), Some(2));
    }

    #[test]
    fn canonical_key_ignores_parameter_order() {
        let a = ResponseCache::<()>::canonical_key(
            "context",
            "inventory",
            vec![("sku".to_string(), "x".to_string()), ("limit".to_string(), "10".to_string())],
        );
        let b = ResponseCache::<()>::canonical_key(
            "context",
            "inventory",
            vec![("limit".to_string(), "10".to_string()), ("sku".to_string(), "x".to_string())],
        );
        assert_eq!(a, b);
    }

    #[test]
    fn canonical_key_excludes_caller_identity_by_construction() {
        // The key is built only from operation + logical key + params: a caller
        // cannot inject their own identity into it, because it's never passed in.
        let key = ResponseCache::<()>::canonical_key("context", "inventory", vec![]);
        assert_eq!(key, "context::inventory::");
    }

    #[test]
    fn sweep_removes_only_expired_entries() {
        let cache: ResponseCache<u32> = ResponseCache::new();
        cache.put("stale".to_string(), 1, Duration::from_millis(5));
        cache.put("fresh".to_string(), 2, Duration::from_secs(60));
        std::thread::sleep(Duration::from_millis(20));
        cache.sweep_expired();
        assert!(cache.get("stale").is_none());
        assert_eq!(cache.get("fresh").map(|v| *v), Some(2));
    }
}
