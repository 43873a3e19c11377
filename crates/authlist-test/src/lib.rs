//! Authlist Test - Shared test utilities for the authorization broker.
//!
//! This crate provides mock collaborators and fixtures that can be used
//! across the authlist crates as a dev-dependency.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! authlist-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use authlist_broker::{AuthorizationBroker, CommandError};
//! use authlist_test::{MockCommander, test_registry};
//!
//! #[tokio::test]
//! async fn refused_update_faults_the_broker() {
//!     let commander = MockCommander::new()
//!         .with_failure("Foo", CommandError::Rejected("busy".into()));
//!     let broker = AuthorizationBroker::builder(test_registry(), Arc::new(commander))
//!         .build()
//!         .unwrap();
//!     // ...
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
