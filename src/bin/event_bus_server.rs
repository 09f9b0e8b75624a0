//! Event Bus service binary. Same shell as `registry_server`, fronting
//! `EventBusService` over an in-memory `Broker` instead of a `KvStore`.

use std::sync::Arc;

use agentmesh_fabric::config::FabricConfig;
use agentmesh_fabric::keyset::KeySetCache;
use agentmesh_fabric::pipeline::Pipeline;
use agentmesh_fabric::services::event_bus::EventBusService;
use agentmesh_fabric::shutdown::wait_for_shutdown_signal;
use agentmesh_fabric::store::{Broker, InMemoryBroker};
use agentmesh_fabric::telemetry;
use agentmesh_fabric::verifier::TokenVerifier;

const SERVER_NAME: &str = "EventBusServer";

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
    let broker: Arc<dyn Broker> = Arc::new(InMemoryBroker::default());

    let _event_bus = EventBusService::new(pipeline, broker);

    tracing::info!(server = SERVER_NAME, "event bus service ready");
    wait_for_shutdown_signal().await;
    tracing::info!(server = SERVER_NAME, "shutting down");
    Ok(())
}
