//! Configuration types for the authlist broker.
//!
//! Every struct implements [`Default`] matching `defaults.toml`, so a bare
//! `[section]` header produces a working configuration. Types here are plain
//! data; the daemon converts them into broker and registry types at startup.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Decision mode and timing knobs.
    pub broker: BrokerSection,
    /// External approval service connection.
    pub approval: ApprovalSection,
    /// Controllable components.
    pub registry: RegistrySection,
    /// JSON-RPC listener.
    pub rpc: RpcSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// BrokerSection
// ---------------------------------------------------------------------------

/// Decision mode and timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerSection {
    /// `"auto"` approves every valid request; `"external"` defers to the
    /// approval service.
    pub mode: String,
    /// Seconds between approval poll cycles.
    pub poll_interval_secs: u64,
    /// Seconds a request may stay pending before it expires.
    pub approval_timeout_secs: u64,
    /// Submission retries after the first attempt.
    pub submission_retry_limit: u32,
    /// Backoff before the first submission retry.
    pub submission_initial_delay_ms: u64,
    /// Backoff cap between submission retries.
    pub submission_max_delay_ms: u64,
    /// Bound on a single submission attempt.
    pub submission_timeout_secs: u64,
    /// Bound on a single component command.
    pub command_timeout_secs: u64,
    /// Consecutive failed poll cycles tolerated before the broker faults.
    pub consecutive_failure_fault_threshold: u32,
}

impl Default for BrokerSection {
    fn default() -> Self {
        Self {
            mode: "auto".to_owned(),
            poll_interval_secs: 1,
            approval_timeout_secs: 600,
            submission_retry_limit: 3,
            submission_initial_delay_ms: 500,
            submission_max_delay_ms: 10_000,
            submission_timeout_secs: 10,
            command_timeout_secs: 5,
            consecutive_failure_fault_threshold: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// ApprovalSection
// ---------------------------------------------------------------------------

/// External approval service connection.
///
/// Credentials are never printed by `Debug` and never serialized.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ApprovalSection {
    /// Base URL of the approval service (required in external mode).
    pub url: Option<String>,
    /// Login user name.
    #[serde(skip_serializing)]
    pub username: Option<String>,
    /// Login password.
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// `"per_request"` logs in before every call; `"cached"` reuses the
    /// token until the service answers 401.
    pub token_policy: String,
    /// Bound on every HTTP call.
    pub request_timeout_secs: u64,
}

impl std::fmt::Debug for ApprovalSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApprovalSection")
            .field("url", &self.url)
            .field("has_username", &self.username.is_some())
            .field("has_password", &self.password.is_some())
            .field("token_policy", &self.token_policy)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl Serialize for ApprovalSection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ApprovalSection", 3)?;
        state.serialize_field("url", &self.url)?;
        state.serialize_field("token_policy", &self.token_policy)?;
        state.serialize_field("request_timeout_secs", &self.request_timeout_secs)?;
        state.end()
    }
}

impl Default for ApprovalSection {
    fn default() -> Self {
        Self {
            url: None,
            username: None,
            password: None,
            token_policy: "per_request".to_owned(),
            request_timeout_secs: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// RegistrySection
// ---------------------------------------------------------------------------

/// Controllable components, inline and/or from a separate file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySection {
    /// Path to a TOML file holding more `[[components]]` entries.
    pub path: Option<String>,
    /// Inline entries.
    pub components: Vec<ComponentEntry>,
}

/// One registry entry as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentEntry {
    /// Subsystem name, e.g. `ATDome`.
    pub name: String,
    /// Inclusive `[min, max]` index range for indexed components.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices: Option<[u32; 2]>,
    /// Command endpoint; `{index}` is replaced by the component index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// Shape of a standalone components file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ComponentsFile {
    pub(crate) components: Vec<ComponentEntry>,
}

// ---------------------------------------------------------------------------
// RpcSection
// ---------------------------------------------------------------------------

/// JSON-RPC listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcSection {
    /// Socket address the daemon binds.
    pub listen: String,
}

impl Default for RpcSection {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:7420".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Default level (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    /// Output format (`pretty`, `compact`, `json`, `full`).
    pub format: String,
    /// Extra filter directives, e.g. `authlist_broker=debug`.
    pub directives: Vec<String>,
    /// When set, logs also go to daily-rotated files in this directory.
    pub file_dir: Option<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "pretty".to_owned(),
            directives: Vec::new(),
            file_dir: None,
        }
    }
}
