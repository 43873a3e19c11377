//! The decision path, chosen once at startup.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use authlist_core::{AuthorizationRequest, BrokerResult, RequestId, RequestOutcome};

use crate::approval::ReferenceToken;
use crate::auto::AutoApprover;
use crate::poller::PollerHandle;

/// How requests are approved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionMode {
    /// Every valid request is approved immediately.
    #[default]
    Auto,
    /// Requests wait for the external approval service.
    External,
}

impl FromStr for DecisionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "external" => Ok(Self::External),
            other => Err(format!("unknown decision mode '{other}'")),
        }
    }
}

impl fmt::Display for DecisionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::External => f.write_str("external"),
        }
    }
}

/// What happened to a submitted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Decided and applied within the call.
    Decided(RequestOutcome),
    /// Handed to the approval service; the outcome arrives later.
    Deferred {
        /// Broker-side request id.
        request_id: RequestId,
        /// Approval service token.
        token: ReferenceToken,
    },
}

/// The configured decision path.
#[derive(Debug)]
pub enum Decider {
    /// Immediate approval.
    Auto(AutoApprover),
    /// Deferred approval through the poller.
    External(PollerHandle),
}

impl Decider {
    /// Which path this is.
    #[must_use]
    pub fn mode(&self) -> DecisionMode {
        match self {
            Self::Auto(_) => DecisionMode::Auto,
            Self::External(_) => DecisionMode::External,
        }
    }

    /// Route a validated request down the configured path.
    ///
    /// # Errors
    ///
    /// Propagates [`AutoApprover::decide`] and [`PollerHandle::submit`]
    /// errors.
    pub async fn submit(&self, request: AuthorizationRequest) -> BrokerResult<Submission> {
        match self {
            Self::Auto(auto) => auto.decide(request).await.map(Submission::Decided),
            Self::External(poller) => {
                let request_id = request.id;
                let token = poller.submit(request).await?;
                Ok(Submission::Deferred { request_id, token })
            },
        }
    }
}
