//! Prelude module - commonly used types for convenient import.
//!
//! Use `use authlist_core::prelude::*;` to import all essential types.

// Errors
pub use crate::{BrokerError, BrokerResult};

// Names and registry
pub use crate::{ComponentName, ComponentRegistry, IndexRange, Principal, RegistryEntry};

// Requests and outcomes
pub use crate::{
    AuthorizationRequest, ComponentResult, Disposition, RawAuthorizationRequest, RequestId,
    RequestKey, RequestOutcome, validate,
};

// Retry utilities
pub use crate::{RetryConfig, RetryOutcome, retry};
