//! Client behaviour against a scripted HTTP server.

#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use tokio::net::TcpListener;

use authlist_broker::{ApprovalError, ApprovalService, DecisionStatus, ReferenceToken};
use authlist_core::{
    AuthorizationRequest, ComponentName, ComponentResult, Principal, RequestId, RequestOutcome,
};
use authlist_rest::{RestApprovalService, RestSettings, TokenPolicy};

#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    path: String,
    authorization: Option<String>,
    body: String,
}

type Routes = HashMap<(String, String), VecDeque<(u16, String)>>;

#[derive(Clone, Default)]
struct Script {
    routes: Arc<Mutex<Routes>>,
    log: Arc<Mutex<Vec<Recorded>>>,
}

/// Answers each route with its scripted responses in order, repeating the
/// last one. Unknown routes get 404.
struct ScriptedServer {
    addr: SocketAddr,
    script: Script,
}

impl ScriptedServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let script = Script::default();

        let app = Router::new()
            .fallback(answer)
            .with_state(script.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, script }
    }

    fn route(&self, method: &str, path: &str, status: u16, body: &str) {
        self.script
            .routes
            .lock()
            .unwrap()
            .entry((method.to_string(), path.to_string()))
            .or_default()
            .push_back((status, body.to_string()));
    }

    fn calls(&self, method: &str, path: &str) -> Vec<Recorded> {
        self.script
            .log
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .cloned()
            .collect()
    }

    fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

async fn answer(
    State(script): State<Script>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let method = method.as_str().to_string();
    let path = uri.path().to_string();
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    script.log.lock().unwrap().push(Recorded {
        method: method.clone(),
        path: path.clone(),
        authorization,
        body,
    });

    let (status, reply) = {
        let mut routes = script.routes.lock().unwrap();
        match routes.get_mut(&(method, path)) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap(),
            None => (404, "{}".to_string()),
        }
    };
    (
        StatusCode::from_u16(status).unwrap(),
        [(header::CONTENT_TYPE, "application/json")],
        reply,
    )
}

const LOGIN: &str = "/manager/api/get-token/";
const REQUESTS: &str = "/manager/api/authlistrequest/";

fn client(server: &ScriptedServer, policy: TokenPolicy) -> RestApprovalService {
    RestApprovalService::new(RestSettings {
        base_url: server.url(),
        username: Some("svc".into()),
        password: Some("hunter2".into()),
        token_policy: policy,
        request_timeout: Duration::from_secs(5),
    })
    .unwrap()
}

fn request() -> AuthorizationRequest {
    AuthorizationRequest {
        id: RequestId::new(),
        requester: Principal::parse("userA@host").unwrap(),
        authorize: BTreeSet::from([ComponentName::parse("ATDome").unwrap()]),
        unauthorize: BTreeSet::new(),
        received_at: chrono::Utc::now(),
    }
}

#[tokio::test]
async fn per_request_policy_logs_in_before_every_call() {
    let server = ScriptedServer::start().await;
    server.route("POST", LOGIN, 200, r#"{"data":{"token":"t1"}}"#);
    server.route("POST", REQUESTS, 201, r#"{"id":5,"status":"Pending"}"#);
    server.route("GET", "/manager/api/authlistrequest/5/", 200, r#"{"id":5,"status":"Authorized"}"#);
    let service = client(&server, TokenPolicy::PerRequest);

    let token = service.submit(&request()).await.unwrap();
    assert_eq!(token, ReferenceToken::new("5"));
    assert_eq!(service.poll(&token).await.unwrap(), DecisionStatus::Approved);

    let logins = server.calls("POST", LOGIN);
    assert_eq!(logins.len(), 2);
    assert!(logins[0].body.contains(r#""username":"svc""#));

    let submitted = server.calls("POST", REQUESTS);
    assert_eq!(submitted[0].authorization.as_deref(), Some("t1"));
    let body: serde_json::Value = serde_json::from_str(&submitted[0].body).unwrap();
    assert_eq!(body["cscs_to_change"], "ATDome");
    assert_eq!(body["authorized_users"], "+userA@host");
    assert_eq!(body["unauthorized_cscs"], "");
    assert_eq!(body["requested_by"], "userA@host");
}

#[tokio::test]
async fn large_submission_body_arrives_whole() {
    let server = ScriptedServer::start().await;
    server.route("POST", LOGIN, 200, r#"{"data":{"token":"t1"}}"#);
    server.route("POST", REQUESTS, 201, r#"{"id":6,"status":"Pending"}"#);
    let service = client(&server, TokenPolicy::PerRequest);

    let mut big = request();
    big.authorize = (1..=400)
        .map(|i| ComponentName::with_index("Test", i))
        .collect();
    service.submit(&big).await.unwrap();

    let submitted = server.calls("POST", REQUESTS);
    let body: serde_json::Value = serde_json::from_str(&submitted[0].body).unwrap();
    let names: Vec<&str> = body["cscs_to_change"].as_str().unwrap().split(',').collect();
    assert_eq!(names.len(), 400);
    assert_eq!(names.last(), Some(&"Test:400"));
}

#[tokio::test]
async fn cached_policy_reauthenticates_once_on_401() {
    let server = ScriptedServer::start().await;
    server.route("POST", LOGIN, 200, r#"{"data":{"token":"t1"}}"#);
    server.route("POST", LOGIN, 200, r#"{"data":{"token":"t2"}}"#);
    let detail = "/manager/api/authlistrequest/9/";
    server.route("GET", detail, 401, r#"{"detail":"token expired"}"#);
    server.route("GET", detail, 200, r#"{"status":"Pending"}"#);
    let service = client(&server, TokenPolicy::Cached);
    let token = ReferenceToken::new("9");

    assert_eq!(service.poll(&token).await.unwrap(), DecisionStatus::Pending);
    assert_eq!(service.poll(&token).await.unwrap(), DecisionStatus::Pending);

    assert_eq!(server.calls("POST", LOGIN).len(), 2);
    let polls: Vec<_> = server
        .calls("GET", detail)
        .into_iter()
        .map(|r| r.authorization.unwrap())
        .collect();
    assert_eq!(polls, ["t1", "t2", "t2"]);
}

#[tokio::test]
async fn unknown_request_polls_as_not_found() {
    let server = ScriptedServer::start().await;
    server.route("POST", LOGIN, 200, r#"{"data":{"token":"t1"}}"#);
    let service = client(&server, TokenPolicy::PerRequest);

    let status = service.poll(&ReferenceToken::new("404")).await.unwrap();
    assert_eq!(status, DecisionStatus::NotFound);
}

#[tokio::test]
async fn server_error_is_retryable() {
    let server = ScriptedServer::start().await;
    server.route("POST", LOGIN, 200, r#"{"data":{"token":"t1"}}"#);
    server.route("POST", REQUESTS, 500, "database unavailable");
    let service = client(&server, TokenPolicy::PerRequest);

    let err = service.submit(&request()).await.unwrap_err();
    assert_eq!(
        err,
        ApprovalError::Status {
            status: 500,
            message: "database unavailable".into()
        }
    );
    assert!(err.is_retryable());
}

#[tokio::test]
async fn failed_login_is_an_auth_error() {
    let server = ScriptedServer::start().await;
    server.route("POST", LOGIN, 400, r#"{"non_field_errors":["bad credentials"]}"#);
    let service = client(&server, TokenPolicy::PerRequest);

    let err = service.submit(&request()).await.unwrap_err();
    assert!(matches!(err, ApprovalError::Auth(_)));
    assert!(server.calls("POST", REQUESTS).is_empty());
}

#[tokio::test]
async fn execution_report_is_put_to_execute() {
    let server = ScriptedServer::start().await;
    server.route("POST", LOGIN, 200, r#"{"data":{"token":"t1"}}"#);
    let execute = "/manager/api/authlistrequest/3/execute";
    server.route("PUT", execute, 200, r#"{"id":3}"#);
    let service = client(&server, TokenPolicy::PerRequest);

    let results = BTreeMap::from([(
        ComponentName::parse("ATDome").unwrap(),
        ComponentResult::failed("timeout"),
    )]);
    let outcome = RequestOutcome::applied(request(), results);
    service
        .report_execution(&ReferenceToken::new("3"), &outcome)
        .await
        .unwrap();

    let put = &server.calls("PUT", execute)[0];
    let body: serde_json::Value = serde_json::from_str(&put.body).unwrap();
    assert_eq!(body["execution_status"], "Failed");
    assert!(
        body["execution_message"]
            .as_str()
            .unwrap()
            .contains("ATDome (timeout)")
    );
}

#[tokio::test]
async fn closed_port_is_unreachable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let service = RestApprovalService::new(RestSettings {
        base_url: format!("http://{addr}"),
        username: Some("svc".into()),
        password: Some("hunter2".into()),
        token_policy: TokenPolicy::PerRequest,
        request_timeout: Duration::from_secs(5),
    })
    .unwrap();

    let err = service.submit(&request()).await.unwrap_err();
    assert!(matches!(err, ApprovalError::Unreachable(_)));
    assert!(err.is_retryable());
}
