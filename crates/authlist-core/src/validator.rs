//! Request validation.
//!
//! Checks, in order: requester grammar, component grammar and registry
//! membership for both lists, disjointness of the lists, and that at least
//! one list is non-empty. The first violation is reported as
//! [`BrokerError::InvalidRequest`] naming the offending entry.

use std::collections::BTreeSet;

use chrono::Utc;

use crate::component::{ComponentName, Principal};
use crate::error::{BrokerError, BrokerResult};
use crate::registry::ComponentRegistry;
use crate::request::{AuthorizationRequest, RawAuthorizationRequest, RequestId};

/// Validate a raw request against the registry.
///
/// # Errors
///
/// Returns [`BrokerError::InvalidRequest`] on the first violation found.
pub fn validate(
    raw: &RawAuthorizationRequest,
    registry: &ComponentRegistry,
) -> BrokerResult<AuthorizationRequest> {
    let requester = Principal::parse(&raw.requester)
        .map_err(|e| BrokerError::invalid(raw.requester.clone(), e.to_string()))?;

    let authorize = check_list(&raw.authorize, registry)?;
    let unauthorize = check_list(&raw.unauthorize, registry)?;

    if let Some(overlap) = authorize.intersection(&unauthorize).next() {
        return Err(BrokerError::invalid(
            overlap.to_string(),
            "appears in both the authorize and unauthorize lists",
        ));
    }

    if authorize.is_empty() && unauthorize.is_empty() {
        return Err(BrokerError::invalid(
            requester.to_string(),
            "no components specified; request has no effect",
        ));
    }

    Ok(AuthorizationRequest {
        id: RequestId::new(),
        requester,
        authorize,
        unauthorize,
        received_at: Utc::now(),
    })
}

fn check_list(
    names: &[String],
    registry: &ComponentRegistry,
) -> BrokerResult<BTreeSet<ComponentName>> {
    let mut parsed = BTreeSet::new();
    for text in names {
        let name = ComponentName::parse(text)
            .map_err(|e| BrokerError::invalid(text.trim(), e.to_string()))?;
        registry
            .check(&name)
            .map_err(|reason| BrokerError::invalid(name.to_string(), reason))?;
        parsed.insert(name);
    }
    Ok(parsed)
}
