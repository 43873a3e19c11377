//! Contract with the external approval service.
//!
//! The service is a human-in-the-loop review system. It cannot push
//! decisions, so the broker submits a request, keeps the returned
//! [`ReferenceToken`], and polls it until the status is terminal.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use authlist_core::{AuthorizationRequest, RequestOutcome};

/// Identifier the approval service assigns to a submitted request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceToken(pub String);

impl ReferenceToken {
    /// Wrap a service-side identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReferenceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Current status of a submitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    /// No decision yet.
    Pending,
    /// Approved; the broker should apply it.
    Approved,
    /// Rejected by a reviewer.
    Rejected,
    /// The service does not know the token.
    NotFound,
}

impl DecisionStatus {
    /// Whether the status ends the request's pending life.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Errors talking to the approval service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApprovalError {
    /// Connection-level failure.
    #[error("approval service unreachable: {0}")]
    Unreachable(String),
    /// The service answered with an unexpected HTTP status.
    #[error("approval service returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },
    /// Login failed or the credentials are missing.
    #[error("approval service authentication failed: {0}")]
    Auth(String),
    /// The response could not be understood.
    #[error("unexpected approval service response: {0}")]
    Protocol(String),
    /// The call did not finish in time.
    #[error("approval service call timed out")]
    Timeout,
}

impl ApprovalError {
    /// Whether repeating the same call could succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unreachable(_) | Self::Timeout => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Auth(_) | Self::Protocol(_) => false,
        }
    }
}

/// Submit/poll access to the external approval service.
///
/// Retries and timeouts are the poller's job; implementations make exactly
/// one attempt per call.
#[async_trait]
pub trait ApprovalService: Send + Sync {
    /// Hand a request to reviewers.
    async fn submit(&self, request: &AuthorizationRequest) -> Result<ReferenceToken, ApprovalError>;

    /// Fetch the current decision for a submitted request.
    async fn poll(&self, token: &ReferenceToken) -> Result<DecisionStatus, ApprovalError>;

    /// Tell the service how applying an approved request went.
    async fn report_execution(
        &self,
        token: &ReferenceToken,
        outcome: &RequestOutcome,
    ) -> Result<(), ApprovalError>;
}
