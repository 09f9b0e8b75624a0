//! Context/Tool Server service binary.
//!
//! Fronts `ContextToolService` over an in-memory `KvStore` and `Broker`. When
//! `FABRIC_DEMO_TELEMETRY_PUSHER=1`, runs the reference's `telemetry_pusher`
//! demo loop (`context_tool_server.py`): every 5 seconds, publish a synthetic
//! `engine_temp` reading on `telemetry:fleet123:engine_temp` so a
//! `SubscribeTelemetry` caller has something to observe without a real
//! telemetry source wired up.

use std::sync::Arc;
use std::time::Duration;

use agentmesh_fabric::config::FabricConfig;
use agentmesh_fabric::keyset::KeySetCache;
use agentmesh_fabric::pipeline::Pipeline;
use agentmesh_fabric::services::context_tool::ContextToolService;
use agentmesh_fabric::shutdown::wait_for_shutdown_signal;
use agentmesh_fabric::store::{Broker, InMemoryBroker, InMemoryKvStore, KvStore};
use agentmesh_fabric::telemetry;
use agentmesh_fabric::verifier::TokenVerifier;

const SERVER_NAME: &str = "ContextToolServer";
const DEMO_TELEMETRY_CHANNEL: &str = "telemetry:fleet123:engine_temp";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _logging_guard = telemetry::init_logging(SERVER_NAME)?;
    let config = FabricConfig::from_env(SERVER_NAME)?;

    let keyset = Arc::new(KeySetCache::new(
        config.jwks_url.clone(),
        config.jwks_ttl,
        config.jwks_fetch_timeout,
    ));
    let verifier = Arc::new(TokenVerifier::new(
        keyset,
        config.issuer.clone(),
        SERVER_NAME,
        config.clock_skew,
    ));
    let pipeline = Pipeline::new(verifier, SERVER_NAME);
    let store: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
    let broker: Arc<dyn Broker> = Arc::new(InMemoryBroker::default());

    if config.demo_telemetry_pusher {
        let pusher_broker = Arc::clone(&broker);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(5)).await;
                let reading = 65 + (unix_seconds() % 10);
                let payload = format!(r#"{{"engine_temp":{reading}}}"#).into_bytes();
                if let Err(e) = pusher_broker.publish(DEMO_TELEMETRY_CHANNEL, payload).await {
                    tracing::warn!(error = %e, "demo telemetry pusher failed to publish");
                }
            }
        });
    }

    let _context_tool = ContextToolService::new(
        pipeline,
        store,
        broker,
        config.breaker_threshold,
        config.breaker_recovery,
    );

    tracing::info!(server = SERVER_NAME, "context/tool service ready");
    wait_for_shutdown_signal().await;
    tracing::info!(server = SERVER_NAME, "shutting down");
    Ok(())
}

fn unix_seconds() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
