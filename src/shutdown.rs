//! Graceful-shutdown signal handling for the three service binaries.
//!
//! Waits on whichever of SIGINT/SIGTERM (unix) or Ctrl-C (everywhere else)
//! arrives first, so a container orchestrator's `SIGTERM` and an operator's
//! `Ctrl-C` both drain a long-running service the same way.

/// Resolve once either Ctrl-C or (on unix) `SIGTERM` is received.
pub async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler, falling back to ctrl_c only");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
