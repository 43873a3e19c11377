//! Prelude module - commonly used types for convenient import.
//!
//! Use `use authlist_broker::prelude::*;` to import all essential types.

// The broker
pub use crate::{AuthorizationBroker, BrokerBuilder, DecisionMode, Submission};

// Collaborators
pub use crate::{
    ApprovalError, ApprovalService, AuthListUpdate, CommandError, ComponentCommander,
    DecisionStatus, ReferenceToken,
};

// Health
pub use crate::{BrokerHealth, HealthChange, HealthReporter, HealthSnapshot};

// Polling
pub use crate::{PendingInfo, PollerSettings};

// Core types
pub use authlist_core::prelude::*;
