//! Process shutdown signalling.

use tracing::{info, warn};

/// Resolve when the process receives SIGINT or SIGTERM.
///
/// The reconciler and the gRPC server both wait on this; an in-flight
/// reconciliation cycle finishes before the loop exits, so there is never a
/// partial publication.
pub async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(terminate) => terminate,
            Err(error) => {
                warn!(%error, "SIGTERM handler unavailable; only SIGINT is handled");
                let _ = tokio::signal::ctrl_c().await;
                info!("received SIGINT, shutting down");
                return;
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("received SIGINT, shutting down"),
            _ = terminate.recv() => info!("received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("received interrupt, shutting down");
    }
}
