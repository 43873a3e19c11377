//! Broker error taxonomy.
//!
//! Only errors that are surfaced synchronously to the caller of an operation
//! live here. Per-component command failures are recorded in
//! [`RequestOutcome`](crate::RequestOutcome) instead, and approval-service
//! outages escalate through broker health rather than through `Err` values.

use thiserror::Error;

use crate::request::RequestKey;

/// Errors returned synchronously by broker operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    /// The request is malformed or names something unknown. Never retried.
    #[error("invalid request: {name}: {reason}")]
    InvalidRequest {
        /// The offending name (component, requester, or list entry).
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An identical request is already pending or being applied.
    #[error("duplicate request: {key} is already pending")]
    DuplicateRequest {
        /// Dedup key of the request already in flight.
        key: RequestKey,
    },

    /// Hand-off to the approval service failed after the retry budget.
    #[error("submission failed after {attempts} attempt(s): {reason}")]
    SubmissionFailed {
        /// Number of submission attempts made.
        attempts: u32,
        /// Last error reported by the approval service.
        reason: String,
    },

    /// The broker is faulted and not accepting new requests.
    #[error("broker not accepting requests: {reason}")]
    NotAccepting {
        /// The current fault reason.
        reason: String,
    },

    /// The broker or its approval poller has shut down.
    #[error("broker is shut down")]
    Shutdown,

    /// A broker task failed unexpectedly.
    #[error("internal broker error: {reason}")]
    Internal {
        /// What went wrong.
        reason: String,
    },
}

impl BrokerError {
    /// Build an [`BrokerError::InvalidRequest`].
    #[must_use]
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Whether the caller could reasonably retry the same request later.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DuplicateRequest { .. } | Self::SubmissionFailed { .. } | Self::NotAccepting { .. }
        )
    }
}

/// Result type for broker operations.
pub type BrokerResult<T> = Result<T, BrokerError>;
