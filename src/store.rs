//! Narrow interfaces onto the fabric's external collaborators (spec §1, §6):
//! the Registry's persistent record store, the Context Server's relational
//! key/value backing store, and the Event Bus / telemetry pub/sub broker.
//! Real deployments back these with Postgres/Redis (spec's `POSTGRES_URL`,
//! `REDIS_URL`); the in-memory implementations here are the demo/test
//! stand-ins, grounded on the original reference's own Redis-as-KV and
//! Redis-pubsub-as-broker usage (`registry_server.py::register_in_redis`,
//! `event_bus_server.py`'s `redis_client.publish`/`pubsub`) but expressed as
//! narrow Rust traits rather than a concrete Redis dependency, per spec §1's
//! "consumed through narrow interfaces" framing. `dashmap` supplies the
//! lock-free concurrent map, matching the teacher's choice of `dashmap` for
//! its own hot concurrent state.

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::error::FabricError;

/// Key/value backing store used by the Registry (server records) and the
/// Context Server (context entries).
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, FabricError>;
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), FabricError>;
    /// All `(key, value)` pairs whose key starts with `prefix` (the Registry's
    /// `lookup_in_redis`-style keyspace scan).
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, FabricError>;
}

/// In-memory `KvStore` for demos and tests. A real deployment points this
/// interface at Postgres (Context Server) or Redis (Registry) instead.
#[derive(Default)]
pub struct InMemoryKvStore {
    map: DashMap<String, Vec<u8>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, FabricError> {
        Ok(self.map.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), FabricError> {
        self.map.insert(key.to_string(), value);
        Ok(())
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, FabricError> {
        Ok(self
            .map
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect())
    }
}

/// Either an exact channel match or a prefix match (Redis `SUBSCRIBE` vs
/// `PSUBSCRIBE`, spec §4.10: "pattern subscription when `topic_filter` ends
/// with `*`; otherwise exact channel subscription").
#[derive(Debug, Clone)]
pub enum BrokerPattern {
    Exact(String),
    Prefix(String),
}

impl BrokerPattern {
    pub fn matches(&self, channel: &str) -> bool {
        match self {
            BrokerPattern::Exact(c) => c == channel,
            BrokerPattern::Prefix(p) => channel.starts_with(p.as_str()),
        }
    }
}

/// Pub/sub broker used by the Event Bus and the Context Server's telemetry
/// bridge.
#[async_trait]
pub trait Broker: Send + Sync {
    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), FabricError>;
    async fn subscribe(&self, pattern: BrokerPattern) -> Result<BrokerSubscription, FabricError>;
}

/// A live subscription; `recv()` yields the next `(channel, payload)` whose
/// channel matches this subscription's pattern, transparently skipping
/// messages lost to a slow-consumer lag (the in-memory analogue of Redis
/// simply dropping a disconnected/lagging pubsub client's backlog).
pub struct BrokerSubscription {
    rx: broadcast::Receiver<(String, Vec<u8>)>,
    pattern: BrokerPattern,
}

impl BrokerSubscription {
    pub async fn recv(&mut self) -> Option<(String, Vec<u8>)> {
        loop {
            match self.rx.recv().await {
                Ok((channel, payload)) if self.pattern.matches(&channel) => {
                    return Some((channel, payload))
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// In-process fan-out broker for demos and tests: every publish is seen by
/// every subscription, which then filters by its own pattern. A real
/// deployment points this interface at Redis pub/sub instead.
pub struct InMemoryBroker {
    tx: broadcast::Sender<(String, Vec<u8>)>,
}

impl InMemoryBroker {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), FabricError> {
        // No subscribers is not an error: spec's Non-goals exclude durable delivery.
        let _ = self.tx.send((channel.to_string(), payload));
        Ok(())
    }

    async fn subscribe(&self, pattern: BrokerPattern) -> Result<BrokerSubscription, FabricError> {
        Ok(BrokerSubscription {
            rx: self.tx.subscribe(),
            pattern,
        })
    }
}
