//! Daemon error types.

use thiserror::Error;

/// Errors raised while starting or stopping the daemon.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration could not be turned into broker settings.
    #[error("configuration error: {0}")]
    Config(String),

    /// The component registry is invalid.
    #[error("registry error: {0}")]
    Registry(#[from] authlist_core::RegistryError),

    /// The approval service client could not be built.
    #[error("approval client error: {0}")]
    Rest(#[from] authlist_rest::RestError),

    /// The broker refused to start.
    #[error("broker error: {0}")]
    Broker(#[from] authlist_core::BrokerError),

    /// The RPC listener failed.
    #[error("RPC server error: {0}")]
    Server(#[from] std::io::Error),
}

/// Result type for daemon operations.
pub type DaemonResult<T> = Result<T, DaemonError>;
