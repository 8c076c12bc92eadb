//! OS signal handling.
//!
//! # Responsibilities
//! - Register the Ctrl-C handler
//! - Translate it into cancellation of a caller token
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - The watcher exits quietly once the token is cancelled by anyone else

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Cancel `token` when the process receives Ctrl-C.
pub fn cancel_on_ctrl_c(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => {
                    tracing::info!("Interrupt received, cancelling");
                    token.cancel();
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to listen for interrupt");
                }
            },
            _ = token.cancelled() => {}
        }
    })
}
