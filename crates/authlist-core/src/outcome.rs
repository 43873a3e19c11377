//! Per-request outcomes.
//!
//! A [`RequestOutcome`] is produced exactly once per accepted request and is
//! immutable afterwards: fields are private and only readable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::component::ComponentName;
use crate::request::{AuthorizationRequest, RequestId};

/// Failure reason for a command that exceeded its timeout.
pub const REASON_TIMEOUT: &str = "timeout";
/// Failure reason recorded when the approver rejects a request.
pub const REASON_REJECTED: &str = "rejected by approver";
/// Failure reason recorded when a pending request ages out.
pub const REASON_APPROVAL_TIMEOUT: &str = "approval timeout";
/// Failure reason recorded when the approver no longer knows the request.
pub const REASON_NOT_FOUND: &str = "unknown to approver";

/// Result of updating a single component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ComponentResult {
    /// The component acknowledged the update.
    Succeeded,
    /// The update failed or was never issued.
    Failed {
        /// Why it failed.
        reason: String,
    },
}

impl ComponentResult {
    /// Build a failed result.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Whether this component succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl fmt::Display for ComponentResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "success"),
            Self::Failed { reason } => write!(f, "failed({reason})"),
        }
    }
}

/// How a request reached its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Approved and applied to the target components.
    Applied,
    /// Rejected by the approver (or unknown to it).
    Rejected,
    /// No decision arrived within the approval timeout.
    Expired,
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => write!(f, "applied"),
            Self::Rejected => write!(f, "rejected"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

/// The final per-component record for one authorization request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOutcome {
    request: AuthorizationRequest,
    disposition: Disposition,
    results: BTreeMap<ComponentName, ComponentResult>,
    /// First component observed to fail, when results arrived in order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    first_failure: Option<ComponentName>,
    completed_at: DateTime<Utc>,
}

impl RequestOutcome {
    /// Outcome of applying a request. `results` should hold one entry per
    /// target component, in the order the results were observed.
    #[must_use]
    pub fn applied<I>(request: AuthorizationRequest, results: I) -> Self
    where
        I: IntoIterator<Item = (ComponentName, ComponentResult)>,
    {
        let mut first_failure = None;
        let mut collected = BTreeMap::new();
        for (name, result) in results {
            if first_failure.is_none() && !result.is_success() {
                first_failure = Some(name.clone());
            }
            collected.insert(name, result);
        }
        Self {
            request,
            disposition: Disposition::Applied,
            results: collected,
            first_failure,
            completed_at: Utc::now(),
        }
    }

    /// Outcome of a request that was never applied: every target is marked
    /// failed with `reason`.
    #[must_use]
    pub fn not_applied(
        request: AuthorizationRequest,
        disposition: Disposition,
        reason: &str,
    ) -> Self {
        let results = request
            .targets()
            .map(|name| (name.clone(), ComponentResult::failed(reason)))
            .collect();
        Self {
            request,
            disposition,
            results,
            first_failure: None,
            completed_at: Utc::now(),
        }
    }

    /// The request this outcome belongs to.
    #[must_use]
    pub fn request(&self) -> &AuthorizationRequest {
        &self.request
    }

    /// The request ID.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request.id
    }

    /// How the request was resolved.
    #[must_use]
    pub fn disposition(&self) -> Disposition {
        self.disposition
    }

    /// Per-component results in name order.
    #[must_use]
    pub fn results(&self) -> &BTreeMap<ComponentName, ComponentResult> {
        &self.results
    }

    /// Result for a single component.
    #[must_use]
    pub fn result_for(&self, name: &ComponentName) -> Option<&ComponentResult> {
        self.results.get(name)
    }

    /// When the outcome was finalized.
    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    /// True only if every component succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.results.values().all(ComponentResult::is_success)
    }

    /// True if the request was applied and at least one command failed.
    #[must_use]
    pub fn has_command_failure(&self) -> bool {
        self.disposition == Disposition::Applied && !self.is_success()
    }

    /// Components that succeeded, in name order.
    pub fn succeeded(&self) -> impl Iterator<Item = &ComponentName> {
        self.results
            .iter()
            .filter(|(_, r)| r.is_success())
            .map(|(name, _)| name)
    }

    /// Components that failed with their reasons, in name order.
    pub fn failed(&self) -> impl Iterator<Item = (&ComponentName, &str)> {
        self.results.iter().filter_map(|(name, r)| match r {
            ComponentResult::Failed { reason } => Some((name, reason.as_str())),
            ComponentResult::Succeeded => None,
        })
    }

    /// Reason of the first component observed to fail. Falls back to name
    /// order when no observation order was recorded.
    #[must_use]
    pub fn first_failure_reason(&self) -> Option<&str> {
        let observed = self
            .first_failure
            .as_ref()
            .and_then(|name| self.results.get(name))
            .and_then(|result| match result {
                ComponentResult::Failed { reason } => Some(reason.as_str()),
                ComponentResult::Succeeded => None,
            });
        observed.or_else(|| self.failed().next().map(|(_, reason)| reason))
    }

    /// Human-readable summary listing updated and failed components.
    #[must_use]
    pub fn summary(&self) -> String {
        let succeeded: Vec<String> = self.succeeded().map(ToString::to_string).collect();
        let mut message = format!(
            "The following components were updated correctly: {}.",
            succeeded.join(", ")
        );
        let failed: Vec<String> = self
            .failed()
            .map(|(name, reason)| format!("{name} ({reason})"))
            .collect();
        if !failed.is_empty() {
            message.push_str(" The following components failed to update correctly: ");
            message.push_str(&failed.join(", "));
            message.push('.');
        }
        message
    }
}
