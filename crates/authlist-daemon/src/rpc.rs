//! JSON-RPC API definitions.
//!
//! [`AuthlistRpc`] is what the daemon serves to operators and request
//! sources; the CLI uses the generated client. [`ComponentRpc`] is the call
//! every target component exposes so the daemon can update its
//! authorization list.

use authlist_broker::{
    BrokerHealth, DecisionMode, HealthSnapshot, PendingInfo, ReferenceToken, Submission,
};
use authlist_core::{BrokerError, RawAuthorizationRequest, RequestId, RequestOutcome};
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::types::ErrorObjectOwned;
use serde::{Deserialize, Serialize};

// ---------- Wire types ----------

/// Result of `requestAuthorization`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmissionInfo {
    /// Decided and applied within the call (auto mode).
    Decided {
        /// The full outcome.
        outcome: RequestOutcome,
    },
    /// Waiting on the approval service (external mode).
    Deferred {
        /// Broker-side request id.
        request_id: RequestId,
        /// Approval service token.
        token: ReferenceToken,
    },
}

impl From<Submission> for SubmissionInfo {
    fn from(submission: Submission) -> Self {
        match submission {
            Submission::Decided(outcome) => Self::Decided { outcome },
            Submission::Deferred { request_id, token } => Self::Deferred { request_id, token },
        }
    }
}

/// Status information about the running daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon version.
    pub version: String,
    /// How long the daemon has been running (seconds).
    pub uptime_secs: u64,
    /// Configured decision path.
    pub mode: DecisionMode,
    /// Current broker health.
    pub health: BrokerHealth,
    /// Decisions waiting on the approval service.
    pub pending: usize,
    /// Registered subsystems.
    pub subsystems: usize,
}

// ---------- Error codes ----------

/// JSON-RPC error codes returned by the daemon.
pub mod error_codes {
    /// The request is malformed or names an unknown component.
    pub const INVALID_REQUEST: i32 = -32010;
    /// An identical request is already in flight.
    pub const DUPLICATE_REQUEST: i32 = -32011;
    /// The approval service could not take the request.
    pub const SUBMISSION_FAILED: i32 = -32012;
    /// The broker is faulted.
    pub const NOT_ACCEPTING: i32 = -32013;
    /// Anything else, including a broker that is shutting down.
    pub const INTERNAL_ERROR: i32 = -32014;
}

/// Map a broker error onto its JSON-RPC error object.
#[must_use]
pub fn rpc_error(err: &BrokerError) -> ErrorObjectOwned {
    let code = match err {
        BrokerError::InvalidRequest { .. } => error_codes::INVALID_REQUEST,
        BrokerError::DuplicateRequest { .. } => error_codes::DUPLICATE_REQUEST,
        BrokerError::SubmissionFailed { .. } => error_codes::SUBMISSION_FAILED,
        BrokerError::NotAccepting { .. } => error_codes::NOT_ACCEPTING,
        BrokerError::Shutdown | BrokerError::Internal { .. } => error_codes::INTERNAL_ERROR,
    };
    ErrorObjectOwned::owned(code, err.to_string(), None::<()>)
}

// ---------- RPC traits ----------

/// The daemon's JSON-RPC API.
#[rpc(server, client, namespace = "authlist")]
pub trait AuthlistRpc {
    /// Validate and route one authorization request.
    #[method(name = "requestAuthorization")]
    async fn request_authorization(
        &self,
        request: RawAuthorizationRequest,
    ) -> Result<SubmissionInfo, ErrorObjectOwned>;

    /// Current broker health.
    #[method(name = "health")]
    async fn health(&self) -> Result<HealthSnapshot, ErrorObjectOwned>;

    /// Return the broker to Normal.
    #[method(name = "reset")]
    async fn reset(&self) -> Result<HealthSnapshot, ErrorObjectOwned>;

    /// Decisions waiting on the approval service.
    #[method(name = "pending")]
    async fn pending(&self) -> Result<Vec<PendingInfo>, ErrorObjectOwned>;

    /// Every authorizable component name.
    #[method(name = "components")]
    async fn components(&self) -> Result<Vec<String>, ErrorObjectOwned>;

    /// Daemon status summary.
    #[method(name = "status")]
    async fn status(&self) -> Result<DaemonStatus, ErrorObjectOwned>;

    /// Stop the daemon.
    #[method(name = "shutdown")]
    async fn shutdown(&self) -> Result<(), ErrorObjectOwned>;

    /// Stream every finished request outcome.
    #[subscription(name = "subscribeOutcomes" => "outcome", unsubscribe = "unsubscribeOutcomes", item = RequestOutcome)]
    async fn subscribe_outcomes(&self) -> jsonrpsee::core::SubscriptionResult;
}

/// The authorization-list call served by each target component.
#[rpc(server, client)]
pub trait ComponentRpc {
    /// Add and remove principals on the component's authorization list.
    #[method(name = "setAuthList", param_kind = map)]
    async fn set_auth_list(
        &self,
        #[argument(rename = "addAuthorize")] add_authorize: Vec<String>,
        unauthorize: Vec<String>,
    ) -> Result<(), ErrorObjectOwned>;
}
