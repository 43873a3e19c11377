//! Outbound commands to target components.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use authlist_core::{ComponentName, Principal};

/// Payload of a single authorization-list update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthListUpdate {
    /// Principals to add to the component's authorization list.
    pub add_authorize: BTreeSet<String>,
    /// Principals to remove from it.
    pub unauthorize: BTreeSet<String>,
}

impl AuthListUpdate {
    /// Grant `principal` control of the component.
    #[must_use]
    pub fn grant(principal: &Principal) -> Self {
        Self {
            add_authorize: BTreeSet::from([principal.to_string()]),
            unauthorize: BTreeSet::new(),
        }
    }

    /// Revoke `principal`'s control of the component.
    #[must_use]
    pub fn revoke(principal: &Principal) -> Self {
        Self {
            add_authorize: BTreeSet::new(),
            unauthorize: BTreeSet::from([principal.to_string()]),
        }
    }
}

/// Why a component command failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The component could not be reached.
    #[error("unreachable: {0}")]
    Unreachable(String),
    /// The component answered but refused the update.
    #[error("rejected: {0}")]
    Rejected(String),
    /// The component did not answer in time.
    #[error("timeout")]
    Timeout,
    /// No command endpoint is configured for the component.
    #[error("no endpoint")]
    NoEndpoint,
}

/// Transport that delivers authorization-list updates to components.
///
/// Implementations should not retry: a failed command is recorded in the
/// request outcome and retrying is left to whoever submitted the request.
#[async_trait]
pub trait ComponentCommander: Send + Sync {
    /// Send one update to one component and wait for its acknowledgement.
    async fn send_auth_list_update(
        &self,
        component: &ComponentName,
        update: &AuthListUpdate,
    ) -> Result<(), CommandError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_serializes_camel_case() {
        let update = AuthListUpdate::grant(&Principal::parse("userA@host").unwrap());
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["addAuthorize"], serde_json::json!(["userA@host"]));
        assert_eq!(json["unauthorize"], serde_json::json!([]));
    }

    #[test]
    fn error_reasons() {
        assert_eq!(CommandError::Timeout.to_string(), "timeout");
        assert_eq!(CommandError::NoEndpoint.to_string(), "no endpoint");
        assert_eq!(
            CommandError::Unreachable("connection refused".into()).to_string(),
            "unreachable: connection refused"
        );
    }
}
