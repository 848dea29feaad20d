//! Process shutdown signals

use tracing::{info, warn};

/// Resolves on SIGTERM or Ctrl+C, whichever arrives first.
///
/// If the SIGTERM handler cannot be installed only Ctrl+C is watched.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {
                        info!("SIGTERM received, shutting down...");
                    }
                    _ = ctrl_c() => {}
                }
                return;
            }
            Err(e) => warn!("Failed to listen for SIGTERM: {}", e),
        }
    }

    ctrl_c().await;
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Ctrl+C received, shutting down...");
}
