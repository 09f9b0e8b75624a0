//! Discovery Registry service binary.
//!
//! Wires `FabricConfig` into a `KeySetCache`/`TokenVerifier`/`Pipeline` and an
//! in-memory `KvStore`, constructs `RegistryService`, and waits for shutdown.
//! There is no real `tonic`-generated server here: without a `.proto` and a
//! codegen step to run, wiring a wire-protocol listener would be fabricated
//! glue rather than grounded code. This binary is the process shell a real
//! `tonic::transport::Server::add_service(...)` call would be added to.

use std::sync::Arc;

use agentmesh_fabric::config::FabricConfig;
use agentmesh_fabric::keyset::KeySetCache;
use agentmesh_fabric::pipeline::Pipeline;
use agentmesh_fabric::services::registry::RegistryService;
use agentmesh_fabric::shutdown::wait_for_shutdown_signal;
use agentmesh_fabric::store::{InMemoryKvStore, KvStore};
use agentmesh_fabric::telemetry;
use agentmesh_fabric::verifier::TokenVerifier;

const SERVER_NAME: &str = "RegistryServer";

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

    let _registry = RegistryService::new(pipeline, store);

    tracing::info!(server = SERVER_NAME, "registry service ready");
    wait_for_shutdown_signal().await;
    tracing::info!(server = SERVER_NAME, "shutting down");
    Ok(())
}
