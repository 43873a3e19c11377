//! [`ComponentCommander`] that calls `setAuthList` over JSON-RPC.
//!
//! Each component's endpoint comes from its registry entry. `http://` and
//! `https://` endpoints get an HTTP client, `ws://` and `wss://` a WebSocket
//! client. A connection is opened per command.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonrpsee::core::ClientError;
use jsonrpsee::http_client::HttpClientBuilder;
use jsonrpsee::ws_client::WsClientBuilder;
use tracing::debug;

use authlist_broker::{AuthListUpdate, CommandError, ComponentCommander};
use authlist_core::{ComponentName, ComponentRegistry};

use crate::rpc::ComponentRpcClient;

/// Commands components through their registry endpoints.
#[derive(Debug, Clone)]
pub struct RpcCommander {
    registry: Arc<ComponentRegistry>,
    request_timeout: Duration,
}

impl RpcCommander {
    /// Create a commander. `request_timeout` bounds connecting and each call.
    #[must_use]
    pub fn new(registry: Arc<ComponentRegistry>, request_timeout: Duration) -> Self {
        Self {
            registry,
            request_timeout,
        }
    }
}

fn is_websocket(endpoint: &str) -> bool {
    endpoint.starts_with("ws://") || endpoint.starts_with("wss://")
}

/// Map a client failure onto the reason recorded in the outcome.
fn command_error(err: ClientError) -> CommandError {
    match err {
        ClientError::Call(obj) => CommandError::Rejected(obj.message().to_string()),
        ClientError::RequestTimeout => CommandError::Timeout,
        ClientError::ParseError(e) => CommandError::Rejected(format!("invalid reply: {e}")),
        other => CommandError::Unreachable(other.to_string()),
    }
}

#[async_trait]
impl ComponentCommander for RpcCommander {
    async fn send_auth_list_update(
        &self,
        component: &ComponentName,
        update: &AuthListUpdate,
    ) -> Result<(), CommandError> {
        let endpoint = self
            .registry
            .endpoint_for(component)
            .ok_or(CommandError::NoEndpoint)?;
        let add: Vec<String> = update.add_authorize.iter().cloned().collect();
        let remove: Vec<String> = update.unauthorize.iter().cloned().collect();
        debug!(component = %component, endpoint = %endpoint, "sending setAuthList");

        if is_websocket(&endpoint) {
            let client = WsClientBuilder::default()
                .connection_timeout(self.request_timeout)
                .request_timeout(self.request_timeout)
                .build(&endpoint)
                .await
                .map_err(command_error)?;
            client
                .set_auth_list(add, remove)
                .await
                .map_err(command_error)
        } else {
            let client = HttpClientBuilder::default()
                .request_timeout(self.request_timeout)
                .build(&endpoint)
                .map_err(command_error)?;
            client
                .set_auth_list(add, remove)
                .await
                .map_err(command_error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonrpsee::types::ErrorObjectOwned;

    #[test]
    fn websocket_endpoints_are_recognised() {
        assert!(is_websocket("ws://atdome:9000"));
        assert!(is_websocket("wss://atdome:9000"));
        assert!(!is_websocket("http://atdome:9000"));
    }

    #[test]
    fn client_errors_map_to_reasons() {
        let refused = ClientError::Call(ErrorObjectOwned::owned(
            -32000,
            "not in a commandable state",
            None::<()>,
        ));
        assert_eq!(
            command_error(refused),
            CommandError::Rejected("not in a commandable state".into())
        );
        assert_eq!(command_error(ClientError::RequestTimeout), CommandError::Timeout);
        assert!(matches!(
            command_error(ClientError::Custom("boom".into())),
            CommandError::Unreachable(_)
        ));
    }

    #[tokio::test]
    async fn missing_endpoint_fails_without_a_call() {
        let registry = ComponentRegistry::new([authlist_core::RegistryEntry::new("Foo")]).unwrap();
        let commander = RpcCommander::new(Arc::new(registry), Duration::from_secs(1));
        let principal = authlist_core::Principal::parse("userA").unwrap();

        let err = commander
            .send_auth_list_update(
                &ComponentName::parse("Foo").unwrap(),
                &AuthListUpdate::grant(&principal),
            )
            .await
            .unwrap_err();
        assert_eq!(err, CommandError::NoEndpoint);
    }
}
