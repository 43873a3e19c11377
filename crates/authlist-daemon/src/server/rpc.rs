//! RPC implementation for the daemon server.

use std::sync::Arc;
use std::time::Instant;

use jsonrpsee::types::ErrorObjectOwned;
use jsonrpsee::{PendingSubscriptionSink, SubscriptionMessage};
use tokio::sync::broadcast;
use tracing::{info, warn};

use authlist_broker::{AuthorizationBroker, HealthSnapshot, PendingInfo};
use authlist_core::RawAuthorizationRequest;

use crate::rpc::{AuthlistRpcServer, DaemonStatus, SubmissionInfo, rpc_error};

/// The jsonrpsee RPC method handler.
pub(super) struct RpcImpl {
    /// The broker (shared, does its own locking).
    pub(super) broker: Arc<AuthorizationBroker>,
    /// When the daemon started.
    pub(super) started_at: Instant,
    /// Shutdown signal.
    pub(super) shutdown_tx: broadcast::Sender<()>,
}

#[jsonrpsee::core::async_trait]
impl AuthlistRpcServer for RpcImpl {
    async fn request_authorization(
        &self,
        request: RawAuthorizationRequest,
    ) -> Result<SubmissionInfo, ErrorObjectOwned> {
        self.broker
            .handle_request(&request)
            .await
            .map(SubmissionInfo::from)
            .map_err(|e| rpc_error(&e))
    }

    async fn health(&self) -> Result<HealthSnapshot, ErrorObjectOwned> {
        Ok(self.broker.health())
    }

    async fn reset(&self) -> Result<HealthSnapshot, ErrorObjectOwned> {
        Ok(self.broker.reset())
    }

    async fn pending(&self) -> Result<Vec<PendingInfo>, ErrorObjectOwned> {
        self.broker.pending().await.map_err(|e| rpc_error(&e))
    }

    async fn components(&self) -> Result<Vec<String>, ErrorObjectOwned> {
        Ok(self
            .broker
            .components()
            .iter()
            .map(ToString::to_string)
            .collect())
    }

    async fn status(&self) -> Result<DaemonStatus, ErrorObjectOwned> {
        let pending = self.broker.pending().await.map_err(|e| rpc_error(&e))?;
        Ok(DaemonStatus {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: self.started_at.elapsed().as_secs(),
            mode: self.broker.mode(),
            health: self.broker.health().state,
            pending: pending.len(),
            subsystems: self.broker.registry().len(),
        })
    }

    async fn shutdown(&self) -> Result<(), ErrorObjectOwned> {
        let _ = self.shutdown_tx.send(());
        info!("Shutdown requested via RPC");
        Ok(())
    }

    async fn subscribe_outcomes(
        &self,
        pending: PendingSubscriptionSink,
    ) -> jsonrpsee::core::SubscriptionResult {
        let mut outcome_rx = self.broker.subscribe_outcomes();
        let sink = pending.accept().await?;

        tokio::spawn(async move {
            loop {
                match outcome_rx.recv().await {
                    Ok(outcome) => match SubscriptionMessage::from_json(&outcome) {
                        Ok(msg) => {
                            if sink.send(msg).await.is_err() {
                                break; // Client disconnected.
                            }
                        },
                        Err(e) => warn!("Failed to serialize outcome: {e}"),
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "Outcome subscriber lagged");
                    },
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(())
    }
}
