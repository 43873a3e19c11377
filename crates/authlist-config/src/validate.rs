//! Post-merge configuration validation.

use std::collections::HashSet;

use crate::error::{ConfigError, ConfigResult};
use crate::types::{ComponentEntry, Config};

/// Upper bound on `broker.submission_retry_limit`.
pub const MAX_SUBMISSION_RETRIES: u32 = 20;

/// Validate a fully merged configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_broker(config)?;
    validate_approval(config)?;
    validate_registry(&config.registry.components)?;
    validate_rpc(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_broker(config: &Config) -> ConfigResult<()> {
    let b = &config.broker;

    if !matches!(b.mode.as_str(), "auto" | "external") {
        return Err(ConfigError::invalid(
            "broker.mode",
            format!("unsupported mode '{}'; expected one of: auto, external", b.mode),
        ));
    }

    for (field, value) in [
        ("broker.poll_interval_secs", b.poll_interval_secs),
        ("broker.approval_timeout_secs", b.approval_timeout_secs),
        ("broker.submission_timeout_secs", b.submission_timeout_secs),
        ("broker.command_timeout_secs", b.command_timeout_secs),
    ] {
        if value == 0 {
            return Err(ConfigError::invalid(field, "must be greater than 0"));
        }
    }

    if b.submission_retry_limit > MAX_SUBMISSION_RETRIES {
        return Err(ConfigError::invalid(
            "broker.submission_retry_limit",
            format!(
                "{} exceeds the maximum of {MAX_SUBMISSION_RETRIES}",
                b.submission_retry_limit
            ),
        ));
    }

    if b.submission_max_delay_ms < b.submission_initial_delay_ms {
        return Err(ConfigError::invalid(
            "broker.submission_max_delay_ms",
            "must not be smaller than submission_initial_delay_ms",
        ));
    }

    Ok(())
}

fn validate_approval(config: &Config) -> ConfigResult<()> {
    let a = &config.approval;

    if !matches!(a.token_policy.as_str(), "per_request" | "cached") {
        return Err(ConfigError::invalid(
            "approval.token_policy",
            format!(
                "unsupported policy '{}'; expected one of: per_request, cached",
                a.token_policy
            ),
        ));
    }

    if a.request_timeout_secs == 0 {
        return Err(ConfigError::invalid(
            "approval.request_timeout_secs",
            "must be greater than 0",
        ));
    }

    if config.broker.mode == "external" {
        let has_url = a.url.as_deref().is_some_and(|u| !u.trim().is_empty());
        if !has_url {
            return Err(ConfigError::invalid(
                "approval.url",
                "required when broker.mode is 'external'",
            ));
        }
    }

    if let Some(url) = a.url.as_deref()
        && !url.is_empty()
        && !(url.starts_with("http://") || url.starts_with("https://"))
    {
        return Err(ConfigError::invalid(
            "approval.url",
            format!("'{url}' must start with http:// or https://"),
        ));
    }

    Ok(())
}

/// Validate registry entries: non-empty, well-formed names, no repeats, and
/// `1 <= min <= max` ranges.
///
/// # Errors
///
/// Returns the first offending entry as a validation error.
pub fn validate_registry(components: &[ComponentEntry]) -> ConfigResult<()> {
    if components.is_empty() {
        return Err(ConfigError::invalid(
            "registry.components",
            "at least one component must be registered",
        ));
    }

    let mut seen = HashSet::new();
    for entry in components {
        if !is_subsystem_name(&entry.name) {
            return Err(ConfigError::invalid(
                "registry.components",
                format!("invalid component name '{}'", entry.name),
            ));
        }
        if !seen.insert(entry.name.as_str()) {
            return Err(ConfigError::invalid(
                "registry.components",
                format!("component '{}' is listed more than once", entry.name),
            ));
        }
        if let Some([min, max]) = entry.indices
            && (min == 0 || min > max)
        {
            return Err(ConfigError::invalid(
                "registry.components",
                format!(
                    "component '{}' has invalid index range [{min}, {max}]",
                    entry.name
                ),
            ));
        }
    }

    Ok(())
}

fn is_subsystem_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn validate_rpc(config: &Config) -> ConfigResult<()> {
    if config.rpc.listen.parse::<std::net::SocketAddr>().is_err() {
        return Err(ConfigError::invalid(
            "rpc.listen",
            format!("'{}' is not a socket address", config.rpc.listen),
        ));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    if !matches!(
        l.level.to_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        return Err(ConfigError::invalid(
            "logging.level",
            format!(
                "unsupported level '{}'; expected one of: trace, debug, info, warn, error",
                l.level
            ),
        ));
    }

    if !matches!(l.format.as_str(), "pretty" | "compact" | "json" | "full") {
        return Err(ConfigError::invalid(
            "logging.format",
            format!(
                "unsupported format '{}'; expected one of: pretty, compact, json, full",
                l.format
            ),
        ));
    }

    Ok(())
}
