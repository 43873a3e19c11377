//! Authlist Broker - The decision-and-application engine.
//!
//! This crate provides:
//! - The [`ChangeApplier`]: one authorization-list command per target
//!   component, concurrent, each bounded by a timeout
//! - The [`AutoApprover`] for auto-approval mode
//! - The [`ApprovalPoller`]: submits requests to an external approval
//!   service and polls for decisions in the background
//! - The [`HealthController`] that owns broker health
//! - The [`AuthorizationBroker`] facade tying them together
//!
//! Transports are collaborators: components are commanded through a
//! [`ComponentCommander`] and the approval service is reached through an
//! [`ApprovalService`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use authlist_broker::prelude::*;
//!
//! # async fn example(registry: ComponentRegistry, commander: Arc<dyn ComponentCommander>) -> BrokerResult<()> {
//! let broker = AuthorizationBroker::builder(registry, commander).build()?;
//! let raw = RawAuthorizationRequest::new("userA").authorize(["ATDome"]);
//! if let Submission::Decided(outcome) = broker.handle_request(&raw).await? {
//!     println!("{}", outcome.summary());
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod applier;
pub mod approval;
pub mod auto;
pub mod broker;
pub mod commander;
pub mod decider;
pub mod health;
pub mod poller;

#[cfg(test)]
mod testing;

pub use applier::ChangeApplier;
pub use approval::{ApprovalError, ApprovalService, DecisionStatus, ReferenceToken};
pub use auto::AutoApprover;
pub use broker::{AuthorizationBroker, BrokerBuilder};
pub use commander::{AuthListUpdate, CommandError, ComponentCommander};
pub use decider::{DecisionMode, Decider, Submission};
pub use health::{
    BrokerHealth, HealthChange, HealthController, HealthReporter, HealthSnapshot, LogReporter,
};
pub use poller::{ApprovalPoller, PendingDecision, PendingInfo, PollerHandle, PollerSettings};
