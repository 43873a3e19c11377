//! Daemon JSON-RPC server.
//!
//! Serves the [`AuthlistRpc`](crate::rpc::AuthlistRpc) API over HTTP and
//! `WebSocket` on the configured address. The broker is shared behind an
//! `Arc`; it does its own locking, so RPC handlers never hold a lock across
//! an await.

mod lifecycle;
mod rpc;
mod startup;

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;

use authlist_broker::AuthorizationBroker;

/// The running daemon.
pub struct DaemonServer {
    /// The broker behind every RPC method.
    broker: Arc<AuthorizationBroker>,
    /// When the daemon started.
    started_at: Instant,
    /// Shutdown signal, raised by the `shutdown` RPC method.
    shutdown_tx: broadcast::Sender<()>,
}

impl DaemonServer {
    /// The broker this daemon serves.
    #[must_use]
    pub fn broker(&self) -> &Arc<AuthorizationBroker> {
        &self.broker
    }

    /// Receive the shutdown signal raised over RPC.
    #[must_use]
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }
}
