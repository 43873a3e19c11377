//! Authorization request types.
//!
//! [`RawAuthorizationRequest`] is what the transport delivers: plain strings,
//! unchecked. [`validate`](crate::validate) turns it into an
//! [`AuthorizationRequest`] whose names are parsed, registry-checked and
//! de-duplicated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

use crate::component::{ComponentName, Principal};

/// Unique identifier for an accepted authorization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Create a new random request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req:{}", self.0)
    }
}

/// An authorization request as received from the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAuthorizationRequest {
    /// Who wants control authority.
    pub requester: String,
    /// Components to authorize the requester on.
    #[serde(default)]
    pub authorize: Vec<String>,
    /// Components to revoke the requester from.
    #[serde(default)]
    pub unauthorize: Vec<String>,
}

impl RawAuthorizationRequest {
    /// Create an empty raw request for `requester`.
    #[must_use]
    pub fn new(requester: impl Into<String>) -> Self {
        Self {
            requester: requester.into(),
            authorize: Vec::new(),
            unauthorize: Vec::new(),
        }
    }

    /// Add components to the authorize list.
    #[must_use]
    pub fn authorize<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authorize.extend(names.into_iter().map(Into::into));
        self
    }

    /// Add components to the unauthorize list.
    #[must_use]
    pub fn unauthorize<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unauthorize.extend(names.into_iter().map(Into::into));
        self
    }

    /// Build a raw request from comma-separated list strings.
    ///
    /// Entries are trimmed. An entirely blank string is an empty list; blank
    /// entries between commas are kept so validation can reject them.
    #[must_use]
    pub fn from_comma_separated(requester: &str, authorize: &str, unauthorize: &str) -> Self {
        Self {
            requester: requester.trim().to_string(),
            authorize: split_list(authorize),
            unauthorize: split_list(unauthorize),
        }
    }
}

fn split_list(list: &str) -> Vec<String> {
    if list.trim().is_empty() {
        return Vec::new();
    }
    list.split(',').map(|s| s.trim().to_string()).collect()
}

/// A validated authorization request.
///
/// Invariants (established by [`validate`](crate::validate)): every name is
/// registered, the two sets are disjoint, and at least one is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    /// Unique request identifier.
    pub id: RequestId,
    /// Who wants control authority.
    pub requester: Principal,
    /// Components to authorize the requester on.
    pub authorize: BTreeSet<ComponentName>,
    /// Components to revoke the requester from.
    pub unauthorize: BTreeSet<ComponentName>,
    /// When the request was accepted.
    pub received_at: DateTime<Utc>,
}

impl AuthorizationRequest {
    /// The dedup key for this request.
    #[must_use]
    pub fn key(&self) -> RequestKey {
        RequestKey {
            requester: self.requester.clone(),
            authorize: self.authorize.iter().cloned().collect(),
            unauthorize: self.unauthorize.iter().cloned().collect(),
        }
    }

    /// Every component touched by this request, in name order.
    pub fn targets(&self) -> impl Iterator<Item = &ComponentName> {
        self.authorize.iter().chain(self.unauthorize.iter())
    }

    /// Number of components touched by this request.
    #[must_use]
    pub fn target_count(&self) -> usize {
        self.authorize.len().saturating_add(self.unauthorize.len())
    }
}

/// Identity of a request for duplicate detection: the requester plus both
/// sorted target lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestKey {
    /// Who asked.
    pub requester: Principal,
    /// Sorted authorize targets.
    pub authorize: Vec<ComponentName>,
    /// Sorted unauthorize targets.
    pub unauthorize: Vec<ComponentName>,
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |names: &[ComponentName]| {
            names
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",")
        };
        write!(
            f,
            "{} [+{}] [-{}]",
            self.requester,
            join(&self.authorize),
            join(&self.unauthorize)
        )
    }
}
