//! Test fixtures for common types.

use chrono::Utc;

use authlist_core::{
    AuthorizationRequest, ComponentName, ComponentRegistry, Principal, RawAuthorizationRequest,
    RegistryEntry, RequestId,
};

/// `ATDome`, `Foo`, `MTHexapod:1..=2` and `Test:1..=10`.
///
/// # Panics
///
/// Panics if the fixture entries stop validating.
#[must_use]
pub fn test_registry() -> ComponentRegistry {
    ComponentRegistry::new([
        RegistryEntry::new("ATDome"),
        RegistryEntry::new("Foo"),
        RegistryEntry::indexed("MTHexapod", 1, 2),
        RegistryEntry::indexed("Test", 1, 10),
    ])
    .unwrap_or_else(|e| panic!("fixture registry is invalid: {e}"))
}

/// The requester used by the fixtures: `userA@host`.
///
/// # Panics
///
/// Panics if the principal grammar rejects it.
#[must_use]
pub fn test_principal() -> Principal {
    Principal::parse("userA@host").unwrap_or_else(|e| panic!("fixture principal: {e}"))
}

/// A raw request as it arrives over the wire.
#[must_use]
pub fn test_raw_request(
    requester: &str,
    authorize: &[&str],
    unauthorize: &[&str],
) -> RawAuthorizationRequest {
    RawAuthorizationRequest::new(requester)
        .authorize(authorize.iter().copied())
        .unauthorize(unauthorize.iter().copied())
}

/// A validated request from `userA@host` authorizing `ATDome`.
#[must_use]
pub fn test_request() -> AuthorizationRequest {
    test_request_for("userA@host", &["ATDome"], &[])
}

/// A validated-looking request built without a registry.
///
/// # Panics
///
/// Panics if a name does not parse.
#[must_use]
pub fn test_request_for(
    requester: &str,
    authorize: &[&str],
    unauthorize: &[&str],
) -> AuthorizationRequest {
    let names = |list: &[&str]| {
        list.iter()
            .map(|n| ComponentName::parse(n).unwrap_or_else(|e| panic!("fixture name {n}: {e}")))
            .collect()
    };
    AuthorizationRequest {
        id: RequestId::new(),
        requester: Principal::parse(requester)
            .unwrap_or_else(|e| panic!("fixture requester {requester}: {e}")),
        authorize: names(authorize),
        unauthorize: names(unauthorize),
        received_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_enumerates_ranges() {
        assert_eq!(test_registry().all_names().len(), 14);
    }

    #[test]
    fn request_keys_ignore_order() {
        let a = test_request_for("userA", &["Foo", "ATDome"], &[]);
        let b = test_request_for("userA", &["ATDome", "Foo"], &[]);
        assert_eq!(a.key(), b.key());
        assert_ne!(a.id, b.id);
    }
}
