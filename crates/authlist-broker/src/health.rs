//! Broker health: Normal or Faulted, with the last fault reason.
//!
//! The [`HealthController`] is the single owner of the state. Both the
//! request path and the approval poller report into it; every change is
//! pushed to a [`HealthReporter`] while the lock is held, so reporters see
//! changes in the order they happened. Faulted never clears on its own:
//! only [`HealthController::reset`] returns the broker to Normal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

use authlist_core::RequestOutcome;

/// Process-wide broker health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokerHealth {
    /// Accepting and applying requests.
    Normal,
    /// A fault was observed and not yet reset.
    Faulted,
}

/// Point-in-time view of broker health.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    /// Current state.
    pub state: BrokerHealth,
    /// Most recent fault reason. Kept after a reset for operators.
    pub last_fault_reason: Option<String>,
    /// When `state` last changed.
    pub since: DateTime<Utc>,
}

impl HealthSnapshot {
    /// Whether the broker is faulted.
    #[must_use]
    pub fn is_faulted(&self) -> bool {
        self.state == BrokerHealth::Faulted
    }
}

/// A change pushed to the [`HealthReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthChange {
    /// Normal → Faulted.
    EnteredFault {
        /// The reason that caused the transition.
        reason: String,
    },
    /// Another fault while already Faulted. Not a transition.
    FaultReasonUpdated {
        /// The new reason.
        reason: String,
    },
    /// Faulted → Normal through an explicit reset.
    Recovered,
}

/// Side channel that publishes health changes.
///
/// Called with the controller's lock held: implementations must not block
/// and must not call back into the controller.
pub trait HealthReporter: Send + Sync {
    /// Publish a change along with the state after it.
    fn report(&self, change: &HealthChange, snapshot: &HealthSnapshot);
}

/// Reporter that only writes log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl HealthReporter for LogReporter {
    fn report(&self, change: &HealthChange, _snapshot: &HealthSnapshot) {
        match change {
            HealthChange::EnteredFault { reason } => {
                warn!(reason = %reason, "broker entered fault state");
            },
            HealthChange::FaultReasonUpdated { reason } => {
                warn!(reason = %reason, "broker fault reason updated");
            },
            HealthChange::Recovered => info!("broker recovered"),
        }
    }
}

/// Owner of [`BrokerHealth`].
pub struct HealthController {
    state: Mutex<HealthSnapshot>,
    reporter: Arc<dyn HealthReporter>,
}

impl std::fmt::Debug for HealthController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthController")
            .field("state", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl HealthController {
    /// Start in Normal.
    #[must_use]
    pub fn new(reporter: Arc<dyn HealthReporter>) -> Self {
        Self {
            state: Mutex::new(HealthSnapshot {
                state: BrokerHealth::Normal,
                last_fault_reason: None,
                since: Utc::now(),
            }),
            reporter,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HealthSnapshot> {
        self.state.lock().unwrap_or_else(|e| {
            warn!("health state lock poisoned, recovering");
            e.into_inner()
        })
    }

    /// Fold a finished request into broker health.
    ///
    /// Only applied outcomes with a failed component fault the broker;
    /// rejected and expired requests are not system faults. A fully
    /// successful outcome never changes anything.
    pub fn observe(&self, outcome: &RequestOutcome) {
        if !outcome.has_command_failure() {
            return;
        }
        if let Some(reason) = outcome.first_failure_reason() {
            self.observe_fault(reason);
        }
    }

    /// Record a fault.
    pub fn observe_fault(&self, reason: impl Into<String>) {
        let reason = reason.into();
        let mut state = self.lock();
        let change = match state.state {
            BrokerHealth::Normal => {
                state.state = BrokerHealth::Faulted;
                state.since = Utc::now();
                HealthChange::EnteredFault {
                    reason: reason.clone(),
                }
            },
            BrokerHealth::Faulted => HealthChange::FaultReasonUpdated {
                reason: reason.clone(),
            },
        };
        state.last_fault_reason = Some(reason);
        self.reporter.report(&change, &state);
    }

    /// Operator recovery: Faulted → Normal. A no-op when already Normal.
    pub fn reset(&self) -> HealthSnapshot {
        let mut state = self.lock();
        if state.state == BrokerHealth::Faulted {
            state.state = BrokerHealth::Normal;
            state.since = Utc::now();
            self.reporter.report(&HealthChange::Recovered, &state);
        }
        state.clone()
    }

    /// Current health.
    #[must_use]
    pub fn snapshot(&self) -> HealthSnapshot {
        self.lock().clone()
    }

    /// Whether the broker is faulted.
    #[must_use]
    pub fn is_faulted(&self) -> bool {
        self.lock().state == BrokerHealth::Faulted
    }

    /// The fault reason if the broker is faulted.
    #[must_use]
    pub fn fault_reason(&self) -> Option<String> {
        let state = self.lock();
        match state.state {
            BrokerHealth::Faulted => state.last_fault_reason.clone(),
            BrokerHealth::Normal => None,
        }
    }
}
