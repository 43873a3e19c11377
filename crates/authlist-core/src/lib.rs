//! Authlist Core - Foundation types for the authlist authorization broker.
//!
//! This crate provides:
//! - Component and principal names with their grammar checks
//! - The [`ComponentRegistry`] of controllable components
//! - Raw and validated authorization requests, plus the [`validate`] step
//! - Per-request outcomes ([`RequestOutcome`])
//! - The broker error taxonomy
//! - Retry utilities with exponential backoff
//!
//! # Example
//!
//! ```
//! use authlist_core::{ComponentRegistry, RawAuthorizationRequest, RegistryEntry, validate};
//!
//! let registry = ComponentRegistry::new(vec![
//!     RegistryEntry::new("ATDome"),
//!     RegistryEntry::indexed("MTHexapod", 1, 2),
//! ])
//! .unwrap();
//!
//! let raw = RawAuthorizationRequest::new("userA")
//!     .authorize(["ATDome", "MTHexapod:2"]);
//! let request = validate(&raw, &registry).unwrap();
//! assert_eq!(request.authorize.len(), 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod component;
pub mod error;
pub mod outcome;
pub mod registry;
pub mod request;
pub mod retry;
pub mod validator;

pub use component::{ComponentName, NameError, Principal};
pub use error::{BrokerError, BrokerResult};
pub use outcome::{ComponentResult, Disposition, RequestOutcome};
pub use registry::{ComponentRegistry, IndexRange, RegistryEntry, RegistryError};
pub use request::{AuthorizationRequest, RawAuthorizationRequest, RequestId, RequestKey};
pub use retry::{RetryConfig, RetryOutcome, retry};
pub use validator::validate;
