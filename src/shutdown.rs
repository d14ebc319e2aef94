//! Graceful shutdown helpers.
//!
//! ```no_run
//! # async fn example() {
//! llama_pile::shutdown_signal().await;
//! # }
//! ```

/// Waits for either `Ctrl+C` or `SIGTERM` (on Unix).
pub async fn shutdown_signal() {
    tracing::debug!("awaiting shutdown signal");
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    tracing::debug!("shutdown signal received");
}
