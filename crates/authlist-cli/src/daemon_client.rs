//! Daemon client - connects the CLI to a running `authlistd` over `WebSocket`.

use std::time::Duration;

use jsonrpsee::core::ClientError;
use jsonrpsee::core::client::Subscription;
use jsonrpsee::ws_client::{WsClient, WsClientBuilder};

use authlist_broker::{HealthSnapshot, PendingInfo};
use authlist_core::{RawAuthorizationRequest, RequestOutcome};
use authlist_daemon::{AuthlistRpcClient, DaemonStatus, SubmissionInfo, error_codes};

/// A client that connects to the authlist daemon.
pub(crate) struct DaemonClient {
    client: WsClient,
}

impl DaemonClient {
    /// Connect to the daemon at `url`.
    pub(crate) async fn connect(url: &str) -> anyhow::Result<Self> {
        let client = WsClientBuilder::default()
            .connection_timeout(Duration::from_secs(5))
            .build(url)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to daemon at {url}: {e}"))?;
        Ok(Self { client })
    }

    pub(crate) async fn request_authorization(
        &self,
        request: RawAuthorizationRequest,
    ) -> anyhow::Result<SubmissionInfo> {
        self.client
            .request_authorization(request)
            .await
            .map_err(describe)
    }

    pub(crate) async fn health(&self) -> anyhow::Result<HealthSnapshot> {
        self.client.health().await.map_err(describe)
    }

    pub(crate) async fn reset(&self) -> anyhow::Result<HealthSnapshot> {
        self.client.reset().await.map_err(describe)
    }

    pub(crate) async fn pending(&self) -> anyhow::Result<Vec<PendingInfo>> {
        self.client.pending().await.map_err(describe)
    }

    pub(crate) async fn components(&self) -> anyhow::Result<Vec<String>> {
        self.client.components().await.map_err(describe)
    }

    pub(crate) async fn status(&self) -> anyhow::Result<DaemonStatus> {
        self.client.status().await.map_err(describe)
    }

    pub(crate) async fn shutdown(&self) -> anyhow::Result<()> {
        self.client.shutdown().await.map_err(describe)
    }

    pub(crate) async fn subscribe_outcomes(&self) -> anyhow::Result<Subscription<RequestOutcome>> {
        self.client.subscribe_outcomes().await.map_err(describe)
    }
}

/// Turn a daemon error code into a readable message.
fn describe(err: ClientError) -> anyhow::Error {
    let ClientError::Call(obj) = &err else {
        return anyhow::anyhow!("daemon call failed: {err}");
    };
    let kind = match obj.code() {
        error_codes::INVALID_REQUEST => "invalid request",
        error_codes::DUPLICATE_REQUEST => "duplicate request",
        error_codes::SUBMISSION_FAILED => "submission failed",
        error_codes::NOT_ACCEPTING => "broker faulted",
        _ => "daemon error",
    };
    anyhow::anyhow!("{kind} ({}): {}", obj.code(), obj.message())
}
