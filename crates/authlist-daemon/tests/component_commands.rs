//! `RpcCommander` against real component servers, and a full daemon started
//! from configuration.

#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::ErrorObjectOwned;
use jsonrpsee::ws_client::WsClientBuilder;

use authlist_broker::{AuthListUpdate, CommandError, ComponentCommander};
use authlist_config::{ComponentEntry, Config};
use authlist_core::{ComponentName, ComponentRegistry, ComponentResult, RegistryEntry};
use authlist_daemon::{AuthlistRpcClient, ComponentRpcServer, DaemonServer, RpcCommander, SubmissionInfo};
use authlist_test::test_principal;

type Calls = Arc<Mutex<Vec<(Vec<String>, Vec<String>)>>>;

/// A component that records every `setAuthList` call.
#[derive(Clone, Default)]
struct Component {
    calls: Calls,
    refuse: Option<String>,
}

#[jsonrpsee::core::async_trait]
impl ComponentRpcServer for Component {
    async fn set_auth_list(
        &self,
        add_authorize: Vec<String>,
        unauthorize: Vec<String>,
    ) -> Result<(), ErrorObjectOwned> {
        self.calls.lock().unwrap().push((add_authorize, unauthorize));
        match &self.refuse {
            Some(reason) => Err(ErrorObjectOwned::owned(-32000, reason.clone(), None::<()>)),
            None => Ok(()),
        }
    }
}

async fn start_component(component: Component) -> (SocketAddr, ServerHandle) {
    let server = Server::builder().build("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();
    (addr, server.start(component.into_rpc()))
}

fn name(text: &str) -> ComponentName {
    ComponentName::parse(text).unwrap()
}

#[tokio::test]
async fn http_and_ws_endpoints_receive_updates() {
    let component = Component::default();
    let (addr, handle) = start_component(component.clone()).await;

    let registry = ComponentRegistry::new([
        RegistryEntry::new("ATDome").with_endpoint(format!("http://{addr}")),
        RegistryEntry::indexed("Test", 1, 3).with_endpoint(format!("ws://{addr}")),
    ])
    .unwrap();
    let commander = RpcCommander::new(Arc::new(registry), Duration::from_secs(5));

    commander
        .send_auth_list_update(&name("ATDome"), &AuthListUpdate::grant(&test_principal()))
        .await
        .unwrap();
    commander
        .send_auth_list_update(&name("Test:2"), &AuthListUpdate::revoke(&test_principal()))
        .await
        .unwrap();

    let calls = component.calls.lock().unwrap().clone();
    assert_eq!(
        calls,
        [
            (vec!["userA@host".to_string()], vec![]),
            (vec![], vec!["userA@host".to_string()]),
        ]
    );

    handle.stop().unwrap();
}

#[tokio::test]
async fn refusal_is_recorded_as_rejected() {
    let component = Component {
        refuse: Some("not in a commandable state".into()),
        ..Component::default()
    };
    let (addr, handle) = start_component(component).await;

    let registry =
        ComponentRegistry::new([RegistryEntry::new("Foo").with_endpoint(format!("http://{addr}"))])
            .unwrap();
    let commander = RpcCommander::new(Arc::new(registry), Duration::from_secs(5));

    let err = commander
        .send_auth_list_update(&name("Foo"), &AuthListUpdate::grant(&test_principal()))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        CommandError::Rejected("not in a commandable state".into())
    );

    handle.stop().unwrap();
}

#[tokio::test]
async fn closed_endpoint_is_unreachable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let registry =
        ComponentRegistry::new([RegistryEntry::new("Foo").with_endpoint(format!("http://{addr}"))])
            .unwrap();
    let commander = RpcCommander::new(Arc::new(registry), Duration::from_secs(5));

    let err = commander
        .send_auth_list_update(&name("Foo"), &AuthListUpdate::grant(&test_principal()))
        .await
        .unwrap_err();
    assert!(matches!(err, CommandError::Unreachable(_)));
}

#[tokio::test]
async fn daemon_started_from_config_commands_components() {
    let component = Component::default();
    let (component_addr, component_handle) = start_component(component.clone()).await;

    let mut cfg = Config::default();
    cfg.rpc.listen = "127.0.0.1:0".into();
    cfg.registry.components = vec![
        ComponentEntry {
            name: "ATDome".into(),
            indices: None,
            endpoint: Some(format!("http://{component_addr}")),
        },
        ComponentEntry {
            name: "Foo".into(),
            indices: None,
            endpoint: None,
        },
    ];

    let (daemon, handle, addr) = DaemonServer::start(&cfg).await.unwrap();
    let client = WsClientBuilder::default()
        .build(format!("ws://{addr}"))
        .await
        .unwrap();

    let raw = authlist_test::test_raw_request("userA@host", &["ATDome", "Foo"], &[]);
    let SubmissionInfo::Decided { outcome } = client.request_authorization(raw).await.unwrap()
    else {
        panic!("auto mode decides in the call");
    };

    assert_eq!(
        outcome.result_for(&name("ATDome")),
        Some(&ComponentResult::Succeeded)
    );
    assert_eq!(
        outcome.result_for(&name("Foo")),
        Some(&ComponentResult::failed("no endpoint"))
    );
    assert_eq!(component.calls.lock().unwrap().len(), 1);
    assert!(client.health().await.unwrap().is_faulted());

    daemon.stop(handle).await;
    component_handle.stop().unwrap();
}

#[tokio::test]
async fn daemon_config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[rpc]\nlisten = \"127.0.0.1:0\"\n\n[[registry.components]]\nname = \"MTHexapod\"\nindices = [1, 2]\n",
    )
    .unwrap();

    let cfg = Config::load_file(&path).unwrap();
    let (daemon, handle, addr) = DaemonServer::start(&cfg).await.unwrap();
    let client = WsClientBuilder::default()
        .build(format!("ws://{addr}"))
        .await
        .unwrap();

    assert_eq!(
        client.components().await.unwrap(),
        ["MTHexapod:1", "MTHexapod:2"]
    );

    daemon.stop(handle).await;
}
