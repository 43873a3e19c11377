//! REST client error types.

use thiserror::Error;

use authlist_broker::ApprovalError;

/// Errors from the approval service REST client.
#[derive(Debug, Error)]
pub enum RestError {
    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("HTTP status {status}: {body}")]
    Status {
        /// Status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// Login failed or returned no token.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Credentials were not configured.
    #[error("approval service credentials are not configured")]
    MissingCredentials,

    /// The response body did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The configured base URL is unusable.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for REST client operations.
pub type RestResult<T> = Result<T, RestError>;

impl From<RestError> for ApprovalError {
    fn from(err: RestError) -> Self {
        match err {
            RestError::Http(e) if e.is_timeout() => Self::Timeout,
            RestError::Http(e) if e.is_decode() => Self::Protocol(e.to_string()),
            RestError::Http(e) => Self::Unreachable(e.to_string()),
            RestError::Status { status, body } => Self::Status {
                status,
                message: body,
            },
            RestError::Auth(reason) => Self::Auth(reason),
            e @ RestError::MissingCredentials => Self::Auth(e.to_string()),
            RestError::InvalidResponse(reason) => Self::Protocol(reason),
            e @ (RestError::Url(_) | RestError::Config(_)) => Self::Protocol(e.to_string()),
        }
    }
}
