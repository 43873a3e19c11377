//! Bridge from `authlist_config::Config` to broker and client types.
//!
//! The config crate has no dependencies on other internal crates. This module
//! turns its plain sections into the registry, broker settings and approval
//! client settings the daemon starts with.

use std::net::SocketAddr;
use std::time::Duration;

use authlist_broker::{DecisionMode, PollerSettings};
use authlist_config::{ApprovalSection, Config};
use authlist_core::{ComponentRegistry, RegistryEntry, RetryConfig};
use authlist_rest::{RestSettings, TokenPolicy};

use crate::error::{DaemonError, DaemonResult};

/// Build the component registry from `[registry]`.
///
/// # Errors
///
/// Returns [`DaemonError::Registry`] if the entries do not form a valid
/// registry.
pub fn to_registry(cfg: &Config) -> DaemonResult<ComponentRegistry> {
    let entries = cfg.registry.components.iter().map(|entry| {
        let base = match entry.indices {
            Some([min, max]) => RegistryEntry::indexed(&entry.name, min, max),
            None => RegistryEntry::new(&entry.name),
        };
        match &entry.endpoint {
            Some(endpoint) => base.with_endpoint(endpoint),
            None => base,
        }
    });
    Ok(ComponentRegistry::new(entries)?)
}

/// Parse `broker.mode`.
///
/// # Errors
///
/// Returns [`DaemonError::Config`] for an unknown mode.
pub fn to_decision_mode(cfg: &Config) -> DaemonResult<DecisionMode> {
    cfg.broker.mode.parse().map_err(DaemonError::Config)
}

/// Bound on a single component command.
#[must_use]
pub fn to_command_timeout(cfg: &Config) -> Duration {
    Duration::from_secs(cfg.broker.command_timeout_secs)
}

/// Convert `[broker]` timing knobs to [`PollerSettings`].
#[must_use]
pub fn to_poller_settings(cfg: &Config) -> PollerSettings {
    let broker = &cfg.broker;
    PollerSettings {
        poll_interval: Duration::from_secs(broker.poll_interval_secs),
        approval_timeout: Duration::from_secs(broker.approval_timeout_secs),
        failure_threshold: broker.consecutive_failure_fault_threshold,
        submission: RetryConfig::exponential(
            broker.submission_retry_limit,
            Duration::from_millis(broker.submission_initial_delay_ms),
            Duration::from_millis(broker.submission_max_delay_ms),
        ),
        service_timeout: Duration::from_secs(broker.submission_timeout_secs),
    }
}

/// Convert `[approval]` to [`RestSettings`].
///
/// # Errors
///
/// Returns [`DaemonError::Config`] when no URL is configured, or
/// [`DaemonError::Rest`] for an unknown token policy.
pub fn to_rest_settings(section: &ApprovalSection) -> DaemonResult<RestSettings> {
    let base_url = section
        .url
        .clone()
        .ok_or_else(|| DaemonError::Config("approval.url is required in external mode".into()))?;
    let token_policy: TokenPolicy = section.token_policy.parse()?;

    Ok(RestSettings {
        base_url,
        username: section.username.clone(),
        password: section.password.clone(),
        token_policy,
        request_timeout: Duration::from_secs(section.request_timeout_secs),
    })
}

/// Parse `rpc.listen`.
///
/// # Errors
///
/// Returns [`DaemonError::Config`] if the address does not parse.
pub fn to_listen_addr(cfg: &Config) -> DaemonResult<SocketAddr> {
    cfg.rpc
        .listen
        .parse()
        .map_err(|e| DaemonError::Config(format!("invalid rpc.listen '{}': {e}", cfg.rpc.listen)))
}
