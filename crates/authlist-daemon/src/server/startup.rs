//! Daemon startup: config → registry → broker → RPC listener.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use jsonrpsee::server::{Server, ServerHandle};
use tokio::sync::broadcast;
use tracing::info;

use authlist_broker::{AuthorizationBroker, ComponentCommander, DecisionMode};
use authlist_config::Config;
use authlist_rest::RestApprovalService;

use super::DaemonServer;
use super::rpc::RpcImpl;
use crate::commander::RpcCommander;
use crate::config_bridge;
use crate::error::DaemonResult;
use crate::rpc::AuthlistRpcServer;

impl DaemonServer {
    /// Build the broker described by `cfg` and serve it on `rpc.listen`.
    ///
    /// Components are commanded with [`RpcCommander`]; in external mode the
    /// approval service is reached with [`RestApprovalService`].
    ///
    /// # Errors
    ///
    /// Fails if the configuration cannot be converted, the broker cannot be
    /// built, or the listener cannot bind.
    pub async fn start(cfg: &Config) -> DaemonResult<(Self, ServerHandle, SocketAddr)> {
        let registry = config_bridge::to_registry(cfg)?;
        let mode = config_bridge::to_decision_mode(cfg)?;
        let command_timeout = config_bridge::to_command_timeout(cfg);
        info!(
            mode = %mode,
            subsystems = registry.len(),
            "starting authorization broker"
        );

        let commander: Arc<dyn ComponentCommander> = Arc::new(RpcCommander::new(
            Arc::new(registry.clone()),
            command_timeout,
        ));
        let mut builder = AuthorizationBroker::builder(registry, commander)
            .mode(mode)
            .command_timeout(command_timeout)
            .poller_settings(config_bridge::to_poller_settings(cfg));
        if mode == DecisionMode::External {
            let settings = config_bridge::to_rest_settings(&cfg.approval)?;
            info!(url = %settings.base_url, policy = ?settings.token_policy, "using approval service");
            builder = builder.approval_service(Arc::new(RestApprovalService::new(settings)?));
        }
        let broker = builder.build()?;

        let listen = config_bridge::to_listen_addr(cfg)?;
        Self::serve(Arc::new(broker), listen).await
    }

    /// Serve an already built broker on `listen`.
    ///
    /// # Errors
    ///
    /// Fails if the listener cannot bind.
    pub async fn serve(
        broker: Arc<AuthorizationBroker>,
        listen: SocketAddr,
    ) -> DaemonResult<(Self, ServerHandle, SocketAddr)> {
        let server = Server::builder().build(listen).await?;
        let addr = server.local_addr()?;

        let (shutdown_tx, _) = broadcast::channel(1);
        let daemon = Self {
            broker,
            started_at: Instant::now(),
            shutdown_tx,
        };
        let rpc_impl = RpcImpl {
            broker: Arc::clone(&daemon.broker),
            started_at: daemon.started_at,
            shutdown_tx: daemon.shutdown_tx.clone(),
        };
        let handle = server.start(rpc_impl.into_rpc());

        info!(addr = %addr, "daemon server started");
        Ok((daemon, handle, addr))
    }
}
