//! Ctrl-C handling: the first interrupt cancels the running download.

use pdl_core::CancelToken;

/// Spawns a task that cancels `cancel` on Ctrl-C. Abort the handle once the
/// download is over.
pub fn spawn_ctrl_c_listener(cancel: CancelToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("interrupt received, canceling download");
                eprintln!("\ninterrupted, stopping workers...");
                cancel.cancel();
            }
            Err(e) => tracing::warn!("cannot listen for Ctrl-C: {}", e),
        }
    })
}
