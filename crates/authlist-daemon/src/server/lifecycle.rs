//! Graceful shutdown.

use jsonrpsee::server::ServerHandle;
use tracing::{info, warn};

use super::DaemonServer;

impl DaemonServer {
    /// Stop the broker, then the listener.
    ///
    /// The approval poller finishes its current cycle first, so decisions
    /// already being applied are completed and published.
    pub async fn stop(&self, handle: ServerHandle) {
        self.broker.shutdown().await;
        if handle.stop().is_err() {
            warn!("RPC server was already stopped");
        }
        handle.stopped().await;
        info!("daemon stopped");
    }
}
