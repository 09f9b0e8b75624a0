//! Key Set Cache (KSC) — spec §4.1.
//!
//! Fetches and caches the identity provider's JWKS document. Grounded on the
//! teacher's `JwksBearerProvider` refresh logic (`security/jwks_bearer/mod.rs`):
//! same "stale or missing -> refetch, otherwise serve cached" shape, same
//! "only one caller does the network call, the rest observe its result"
//! single-flight discipline — adapted here from the teacher's synchronous
//! `AtomicBool` debounce + `may::coroutine::sleep` poll loop to an async
//! `tokio::sync::Mutex` held only across the fetch, with `arc_swap` giving
//! lock-free reads of the current snapshot the rest of the time (spec §5:
//! "never hold a lock across network I/O" is satisfied because readers never
//! take the fetch lock at all unless the snapshot is stale).

use arc_swap::ArcSwapOption;
use jsonwebtoken::DecodingKey;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::FabricError;

/// A fetched, parsed snapshot of the identity provider's public keys.
pub struct KeySet {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Instant,
}

impl KeySet {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }

    pub fn get(&self, kid: &str) -> Option<DecodingKey> {
        self.keys.get(kid).cloned()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Observability counters for the key-set cache, in the spirit of the
/// teacher's `cache_hits`/`cache_misses`/`cache_evictions` atomics.
#[derive(Default)]
pub struct KeySetMetrics {
    pub fetches: AtomicU64,
    pub fetch_failures: AtomicU64,
    pub forced_refreshes: AtomicU64,
}

/// Caches the identity provider's public key set, refreshing on TTL expiry
/// or an explicit `force_refresh()` (spec §4.1/§4.2 step 2: unknown `kid`
/// triggers exactly one forced refresh).
pub struct KeySetCache {
    jwks_url: String,
    ttl: Duration,
    fetch_timeout: Duration,
    current: ArcSwapOption<KeySet>,
    force: AtomicBool,
    fetch_lock: Mutex<()>,
    client: reqwest::Client,
    pub metrics: KeySetMetrics,
}

impl KeySetCache {
    pub fn new(jwks_url: impl Into<String>, ttl: Duration, fetch_timeout: Duration) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            ttl,
            fetch_timeout,
            current: ArcSwapOption::empty(),
            force: AtomicBool::new(false),
            fetch_lock: Mutex::new(()),
            client: reqwest::Client::new(),
            metrics: KeySetMetrics::default(),
        }
    }

    /// Mark the cache stale; the next `get_keys()` call refetches.
    pub fn force_refresh(&self) {
        self.force.store(true, Ordering::Release);
        self.metrics.forced_refreshes.fetch_add(1, Ordering::Relaxed);
    }

    fn fresh_snapshot(&self) -> Option<Arc<KeySet>> {
        let snap = self.current.load_full()?;
        if snap.is_fresh(self.ttl) && !self.force.load(Ordering::Acquire) {
            Some(snap)
        } else {
            None
        }
    }

    /// Return the current key set, refreshing first if stale or missing.
    pub async fn get_keys(&self) -> Result<Arc<KeySet>, FabricError> {
        if let Some(snap) = self.fresh_snapshot() {
            return Ok(snap);
        }
        let _guard = self.fetch_lock.lock().await;
        // Double-check: another task may have refreshed while we waited.
        if let Some(snap) = self.fresh_snapshot() {
            return Ok(snap);
        }
        let fetched = Arc::new(self.fetch().await?);
        self.current.store(Some(Arc::clone(&fetched)));
        self.force.store(false, Ordering::Release);
        Ok(fetched)
    }

    async fn fetch(&self) -> Result<KeySet, FabricError> {
        self.metrics.fetches.fetch_add(1, Ordering::Relaxed);
        let resp = self
            .client
            .get(&self.jwks_url)
            .timeout(self.fetch_timeout)
            .send()
            .await
            .map_err(|e| {
                self.metrics.fetch_failures.fetch_add(1, Ordering::Relaxed);
                FabricError::KeyFetchError(format!("jwks fetch failed: {e}"))
            })?;

        if !resp.status().is_success() {
            self.metrics.fetch_failures.fetch_add(1, Ordering::Relaxed);
            return Err(FabricError::KeyFetchError(format!(
                "jwks endpoint returned {}",
                resp.status()
            )));
        }

        let body: serde_json::Value = resp.json().await.map_err(|e| {
            self.metrics.fetch_failures.fetch_add(1, Ordering::Relaxed);
            FabricError::KeyFetchError(format!("jwks body not json: {e}"))
        })?;

        let mut keys = HashMap::new();
        if let Some(arr) = body.get("keys").and_then(|v| v.as_array()) {
            for k in arr {
                let kid = match k.get("kid").and_then(|v| v.as_str()) {
                    Some(k) => k.to_string(),
                    None => continue,
                };
                // RS256-only allow-list (spec §3/§6): skip anything that isn't RSA.
                let kty = k.get("kty").and_then(|v| v.as_str()).unwrap_or("");
                if !kty.eq_ignore_ascii_case("RSA") {
                    continue;
                }
                let (n, e) = match (
                    k.get("n").and_then(|v| v.as_str()),
                    k.get("e").and_then(|v| v.as_str()),
                ) {
                    (Some(n), Some(e)) => (n, e),
                    _ => continue,
                };
                if let Ok(dk) = DecodingKey::from_rsa_components(n, e) {
                    keys.insert(kid, dk);
                }
            }
        }

        debug!(key_count = keys.len(), url = %self.jwks_url, "jwks refreshed");
        Ok(KeySet {
            keys,
            fetched_at: Instant::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn start_mock_jwks() -> (tiny_http::Server, String) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);
        let server = tiny_http::Server::http(addr).expect("tiny_http server");
        let url = format!("http://{addr}/jwks.json");
        (server, url)
    }

    #[tokio::test]
    async fn fetch_parses_rsa_keys_and_skips_unsupported() {
        let body = r#"{"keys":[
            {"kid":"k1","kty":"RSA","n":"sDKtjnO_WU4RC5K6JoxpW4SVDvShKgeOlxaJ6muVhca8qE_7uLZZ7Zqj-m00Fy3xqLfc2SPWww1qaZ3GXBpkJ14IZD3WuKeuD2AvBCNcw-vAhKkcz4sW-YBByko908Q8rs_He_Sf-S4kQVeXJe84f0r_jGUMPfxTB4ID3DkzH5tfV88qI_TAEy63SuX7PBihE4wJwRNSZxJ9GjLQgwcy5443orcVR0_4dih26QO7OpCcTFO4GtJpdwjeWD7l84rWFU2HiskijLww59427M43oJgJT0ggO_WIIqVjEeUcjoXaeL1QSb1Ikl_oqgVdq7Th4Z0l8BvLz5g3S-c60v-STw","e":"AQAB"},
            {"kid":"k2","kty":"oct","k":"c2VjcmV0"}
        ]}"#;
        let (server, url) = start_mock_jwks();
        let handle = std::thread::spawn(move || {
            if let Ok(req) = server.recv() {
                let response = tiny_http::Response::from_string(body.to_string());
                let _ = req.respond(response);
            }
        });

        let cache = KeySetCache::new(url, Duration::from_secs(3600), Duration::from_secs(5));
        let keys = cache.get_keys().await.expect("fetch should succeed");
        assert!(keys.get("k1").is_some(), "RSA key should be present");
        assert!(keys.get("k2").is_none(), "oct key should be skipped (RS256-only)");
        handle.join().ok();
    }

    #[tokio::test]
    async fn force_refresh_triggers_refetch() {
        let body = r#"{"keys":[]}"#;
        let (server, url) = start_mock_jwks();
        let requests = Arc::new(AtomicU64::new(0));
        let requests_clone = Arc::clone(&requests);
        let handle = std::thread::spawn(move || {
            for _ in 0..2 {
                if let Ok(req) = server.recv() {
                    requests_clone.fetch_add(1, Ordering::SeqCst);
                    let response = tiny_http::Response::from_string(body.to_string());
                    let _ = req.respond(response);
                }
            }
        });

        let cache = KeySetCache::new(url, Duration::from_secs(3600), Duration::from_secs(5));
        cache.get_keys().await.expect("first fetch");
        cache.get_keys().await.expect("cached, no refetch");
        assert_eq!(requests.load(Ordering::SeqCst), 1);

        cache.force_refresh();
        cache.get_keys().await.expect("forced refetch");
        assert_eq!(requests.load(Ordering::SeqCst), 2);
        handle.join().ok();
    }

    #[test]
    fn empty_keyset_helpers() {
        let ks = KeySet {
            keys: HashMap::new(),
            fetched_at: Instant::now(),
        };
        assert!(ks.is_empty());
        assert_eq!(ks.len(), 0);
    }
}
