//! Wire format of the approval service.
//!
//! Component and user lists travel as comma-separated strings. Request ids
//! are integers on the service side and become [`ReferenceToken`]s here.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use authlist_broker::{DecisionStatus, ReferenceToken};
use authlist_core::{AuthorizationRequest, ComponentName, RequestOutcome};

use crate::error::{RestError, RestResult};

/// Path of the login endpoint.
pub const GET_TOKEN_ENDPOINT: &str = "manager/api/get-token/";

/// Path of the request collection.
pub const AUTHLISTREQUEST_ENDPOINT: &str = "manager/api/authlistrequest/";

/// Login body.
#[derive(Debug, Serialize)]
pub struct TokenRequest<'a> {
    /// Service account name.
    pub username: &'a str,
    /// Service account password.
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    data: Option<TokenData>,
}

#[derive(Debug, Deserialize)]
struct TokenData {
    token: String,
}

/// Extract the token from a login response.
///
/// # Errors
///
/// Returns [`RestError::Auth`] when the body has no `data.token`.
pub fn parse_token(body: &[u8]) -> RestResult<String> {
    let response: TokenResponse = serde_json::from_slice(body)
        .map_err(|e| RestError::Auth(format!("unreadable login response: {e}")))?;
    response
        .data
        .map(|data| data.token)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| RestError::Auth("login response carries no token".to_string()))
}

/// Body of a new authorization request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitBody {
    /// Components the requester should be authorized on.
    pub cscs_to_change: String,
    /// Users to add, each prefixed with `+`.
    pub authorized_users: String,
    /// Components to remove the requester from.
    pub unauthorized_cscs: String,
    /// Who asked.
    pub requested_by: String,
}

impl SubmitBody {
    /// Build the body for `request`.
    #[must_use]
    pub fn from_request(request: &AuthorizationRequest) -> Self {
        Self {
            cscs_to_change: join(&request.authorize),
            authorized_users: format!("+{}", request.requester),
            unauthorized_cscs: join(&request.unauthorize),
            requested_by: request.requester.to_string(),
        }
    }
}

fn join<'a>(names: impl IntoIterator<Item = &'a ComponentName>) -> String {
    names
        .into_iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: Value,
}

/// Extract the service-side id of a newly created request.
///
/// # Errors
///
/// Returns [`RestError::InvalidResponse`] when there is no usable `id`.
pub fn parse_reference(body: &[u8]) -> RestResult<ReferenceToken> {
    let response: IdResponse =
        serde_json::from_slice(body).map_err(|e| RestError::InvalidResponse(e.to_string()))?;
    match response.id {
        Value::Number(n) => Ok(ReferenceToken::new(n.to_string())),
        Value::String(s) if !s.is_empty() => Ok(ReferenceToken::new(s)),
        other => Err(RestError::InvalidResponse(format!(
            "unusable request id {other}"
        ))),
    }
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
}

/// Map a status string to a decision.
#[must_use]
pub fn decision_from_status(status: &str) -> Option<DecisionStatus> {
    match status.to_ascii_lowercase().as_str() {
        "pending" => Some(DecisionStatus::Pending),
        "authorized" | "approved" => Some(DecisionStatus::Approved),
        "rejected" | "denied" => Some(DecisionStatus::Rejected),
        _ => None,
    }
}

/// Extract the decision from a request detail response.
///
/// # Errors
///
/// Returns [`RestError::InvalidResponse`] for a missing or unknown status.
pub fn parse_decision(body: &[u8]) -> RestResult<DecisionStatus> {
    let response: StatusResponse =
        serde_json::from_slice(body).map_err(|e| RestError::InvalidResponse(e.to_string()))?;
    decision_from_status(&response.status).ok_or_else(|| {
        RestError::InvalidResponse(format!("unknown request status '{}'", response.status))
    })
}

/// Execution result reported back to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Not executed yet.
    Pending,
    /// Every component was updated.
    Successful,
    /// At least one component failed.
    Failed,
}

/// Body of the execute call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Overall result.
    pub execution_status: ExecutionStatus,
    /// Human-readable detail listing updated and failed components.
    pub execution_message: String,
}

impl ExecutionReport {
    /// Build the report for an applied outcome.
    #[must_use]
    pub fn from_outcome(outcome: &RequestOutcome) -> Self {
        Self {
            execution_status: if outcome.is_success() {
                ExecutionStatus::Successful
            } else {
                ExecutionStatus::Failed
            },
            execution_message: outcome.summary(),
        }
    }
}
