//! [`ApprovalService`] over the approval service's REST API.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use authlist_broker::{ApprovalError, ApprovalService, DecisionStatus, ReferenceToken};
use authlist_core::{AuthorizationRequest, RequestOutcome};

use crate::error::{RestError, RestResult};
use crate::messages::{
    AUTHLISTREQUEST_ENDPOINT, ExecutionReport, GET_TOKEN_ENDPOINT, SubmitBody, TokenRequest,
    parse_decision, parse_reference, parse_token,
};

/// Characters of a response body kept in an error message.
const MAX_ERROR_BODY: usize = 512;

/// When the client logs in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TokenPolicy {
    /// Log in before every call.
    #[default]
    PerRequest,
    /// Reuse one token; log in again once when the service answers 401.
    Cached,
}

impl FromStr for TokenPolicy {
    type Err = RestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "per_request" => Ok(Self::PerRequest),
            "cached" => Ok(Self::Cached),
            other => Err(RestError::Config(format!("unknown token policy '{other}'"))),
        }
    }
}

/// Connection settings.
#[derive(Clone)]
pub struct RestSettings {
    /// Service root, e.g. `http://approvals:8000/`.
    pub base_url: String,
    /// Service account name.
    pub username: Option<String>,
    /// Service account password.
    pub password: Option<String>,
    /// Login policy.
    pub token_policy: TokenPolicy,
    /// Bound on every HTTP call.
    pub request_timeout: Duration,
}

impl fmt::Debug for RestSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestSettings")
            .field("base_url", &self.base_url)
            .field("has_username", &self.username.is_some())
            .field("has_password", &self.password.is_some())
            .field("token_policy", &self.token_policy)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

struct Credentials {
    username: String,
    password: String,
}

/// REST client for the approval service.
pub struct RestApprovalService {
    client: Client,
    base: Url,
    credentials: Credentials,
    policy: TokenPolicy,
    cached_token: Mutex<Option<String>>,
}

impl fmt::Debug for RestApprovalService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestApprovalService")
            .field("base", &self.base.as_str())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl RestApprovalService {
    /// Create a client.
    ///
    /// # Errors
    ///
    /// Fails when credentials are missing, the base URL does not parse, or
    /// the HTTP client cannot be built.
    pub fn new(settings: RestSettings) -> RestResult<Self> {
        let (Some(username), Some(password)) = (settings.username, settings.password) else {
            return Err(RestError::MissingCredentials);
        };

        // Endpoints are joined as relative paths, so the base must end in '/'.
        let mut base = Url::parse(&settings.base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base,
            credentials: Credentials { username, password },
            policy: settings.token_policy,
            cached_token: Mutex::new(None),
        })
    }

    /// The login policy in use.
    #[must_use]
    pub fn token_policy(&self) -> TokenPolicy {
        self.policy
    }

    fn endpoint(&self, path: &str) -> RestResult<Url> {
        Ok(self.base.join(path)?)
    }

    fn request_url(&self, token: &ReferenceToken, suffix: &str) -> RestResult<Url> {
        self.endpoint(&format!("{AUTHLISTREQUEST_ENDPOINT}{token}/{suffix}"))
    }

    /// Log in and return a fresh token.
    async fn login(&self) -> RestResult<String> {
        let url = self.endpoint(GET_TOKEN_ENDPOINT)?;
        let response = self
            .client
            .post(url)
            .json(&TokenRequest {
                username: &self.credentials.username,
                password: &self.credentials.password,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(RestError::Auth(format!("login returned HTTP {status}")));
        }
        let body = response.bytes().await?;
        let token = parse_token(&body)?;
        debug!("logged in to approval service");
        Ok(token)
    }

    async fn token(&self) -> RestResult<String> {
        match self.policy {
            TokenPolicy::PerRequest => self.login().await,
            TokenPolicy::Cached => {
                let mut cached = self.cached_token.lock().await;
                if let Some(token) = cached.as_ref() {
                    return Ok(token.clone());
                }
                let token = self.login().await?;
                *cached = Some(token.clone());
                Ok(token)
            },
        }
    }

    /// Send one authenticated call. With a cached token a 401 clears the
    /// cache and the call is repeated once with a fresh login.
    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
    ) -> RestResult<Response> {
        let token = self.token().await?;
        let response = self.send_with(&method, &url, body, &token).await?;

        if response.status() == StatusCode::UNAUTHORIZED && self.policy == TokenPolicy::Cached {
            warn!("approval service rejected cached token, logging in again");
            let fresh = self.login().await?;
            *self.cached_token.lock().await = Some(fresh.clone());
            return self.send_with(&method, &url, body, &fresh).await;
        }
        Ok(response)
    }

    async fn send_with(
        &self,
        method: &Method,
        url: &Url,
        body: Option<&serde_json::Value>,
        token: &str,
    ) -> RestResult<Response> {
        let mut request = self
            .client
            .request(method.clone(), url.clone())
            .header(reqwest::header::AUTHORIZATION, token);
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }
}

/// Turn a non-success response into [`RestError::Status`].
async fn check_status(response: Response) -> RestResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body: String = response
        .text()
        .await
        .unwrap_or_default()
        .chars()
        .take(MAX_ERROR_BODY)
        .collect();
    Err(RestError::Status {
        status: status.as_u16(),
        body,
    })
}

fn to_value<T: serde::Serialize>(body: &T) -> RestResult<serde_json::Value> {
    serde_json::to_value(body).map_err(|e| RestError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl ApprovalService for RestApprovalService {
    async fn submit(&self, request: &AuthorizationRequest) -> Result<ReferenceToken, ApprovalError> {
        let url = self.endpoint(AUTHLISTREQUEST_ENDPOINT)?;
        let body = to_value(&SubmitBody::from_request(request))?;
        let response = check_status(self.send(Method::POST, url, Some(&body)).await?).await?;
        let bytes = response.bytes().await.map_err(RestError::from)?;
        Ok(parse_reference(&bytes)?)
    }

    async fn poll(&self, token: &ReferenceToken) -> Result<DecisionStatus, ApprovalError> {
        let url = self.request_url(token, "")?;
        let response = self.send(Method::GET, url, None).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(DecisionStatus::NotFound);
        }
        let bytes = check_status(response)
            .await?
            .bytes()
            .await
            .map_err(RestError::from)?;
        Ok(parse_decision(&bytes)?)
    }

    async fn report_execution(
        &self,
        token: &ReferenceToken,
        outcome: &RequestOutcome,
    ) -> Result<(), ApprovalError> {
        let url = self.request_url(token, "execute")?;
        let body = to_value(&ExecutionReport::from_outcome(outcome))?;
        check_status(self.send(Method::PUT, url, Some(&body)).await?).await?;
        debug!(token = %token, "execution result reported");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> RestSettings {
        RestSettings {
            base_url: "http://approvals.example:8000".to_string(),
            username: Some("svc".to_string()),
            password: Some("secret".to_string()),
            token_policy: TokenPolicy::Cached,
            request_timeout: Duration::from_secs(10),
        }
    }

    #[test]
    fn missing_credentials_are_rejected() {
        let err = RestApprovalService::new(RestSettings {
            password: None,
            ..settings()
        })
        .unwrap_err();
        assert!(matches!(err, RestError::MissingCredentials));
    }

    #[test]
    fn endpoints_resolve_under_base() {
        let service = RestApprovalService::new(settings()).unwrap();
        assert_eq!(
            service.endpoint(GET_TOKEN_ENDPOINT).unwrap().as_str(),
            "http://approvals.example:8000/manager/api/get-token/"
        );
        let token = ReferenceToken::new("17");
        assert_eq!(
            service.request_url(&token, "execute").unwrap().as_str(),
            "http://approvals.example:8000/manager/api/authlistrequest/17/execute"
        );
        assert_eq!(
            service.request_url(&token, "").unwrap().as_str(),
            "http://approvals.example:8000/manager/api/authlistrequest/17/"
        );
    }

    #[test]
    fn base_path_is_kept() {
        let service = RestApprovalService::new(RestSettings {
            base_url: "http://gw.example/approvals".to_string(),
            ..settings()
        })
        .unwrap();
        assert_eq!(
            service.endpoint(AUTHLISTREQUEST_ENDPOINT).unwrap().as_str(),
            "http://gw.example/approvals/manager/api/authlistrequest/"
        );
    }

    #[test]
    fn debug_hides_secrets() {
        let debug = format!("{:?}", settings());
        assert!(!debug.contains("secret"));
        assert!(debug.contains("has_password: true"));
    }

    #[test]
    fn policy_names() {
        assert_eq!(
            "per_request".parse::<TokenPolicy>().unwrap(),
            TokenPolicy::PerRequest
        );
        assert_eq!("cached".parse::<TokenPolicy>().unwrap(), TokenPolicy::Cached);
        assert!("sometimes".parse::<TokenPolicy>().is_err());
    }
}
