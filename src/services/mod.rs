//! The three service frontings (spec §4.9-4.11). Each is "thin": their
//! logic beyond admission is glue to a backing store or broker, composed
//! from `pipeline::Pipeline`, `cache::ResponseCache`, `breaker::CircuitBreaker`,
//! and `store::{KvStore, Broker}`.

pub mod context_tool;
pub mod event_bus;
pub mod registry;

fn epoch_seconds() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

fn epoch_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
