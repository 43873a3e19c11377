//! The [`AuthorizationBroker`] facade.
//!
//! Wires the validator, the configured [`Decider`], the change applier and
//! the health controller together. Outcomes from both paths end up in the
//! same place: they are folded into broker health and then published on a
//! broadcast channel for audit and reporting.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, warn};

use authlist_core::{
    BrokerError, BrokerResult, ComponentName, ComponentRegistry, RawAuthorizationRequest,
    RequestOutcome, validate,
};

use crate::applier::ChangeApplier;
use crate::approval::ApprovalService;
use crate::auto::AutoApprover;
use crate::commander::ComponentCommander;
use crate::decider::{DecisionMode, Decider, Submission};
use crate::health::{HealthController, HealthReporter, HealthSnapshot, LogReporter};
use crate::poller::{ApprovalPoller, PendingInfo, PollerSettings};

/// Capacity of the outcome broadcast channel.
const OUTCOME_CHANNEL_CAPACITY: usize = 256;

/// Capacity of the poller → broker outcome channel.
const POLLER_OUTCOME_CAPACITY: usize = 64;

/// Builder for [`AuthorizationBroker`].
pub struct BrokerBuilder {
    registry: ComponentRegistry,
    commander: Arc<dyn ComponentCommander>,
    approval: Option<Arc<dyn ApprovalService>>,
    reporter: Arc<dyn HealthReporter>,
    mode: DecisionMode,
    command_timeout: Duration,
    poller: PollerSettings,
}

impl BrokerBuilder {
    /// Start a builder for an auto-approving broker.
    #[must_use]
    pub fn new(registry: ComponentRegistry, commander: Arc<dyn ComponentCommander>) -> Self {
        Self {
            registry,
            commander,
            approval: None,
            reporter: Arc::new(LogReporter),
            mode: DecisionMode::Auto,
            command_timeout: Duration::from_secs(5),
            poller: PollerSettings::default(),
        }
    }

    /// Set the decision path.
    #[must_use]
    pub fn mode(mut self, mode: DecisionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the external approval service. Required in external mode.
    #[must_use]
    pub fn approval_service(mut self, service: Arc<dyn ApprovalService>) -> Self {
        self.approval = Some(service);
        self
    }

    /// Set where health changes are pushed.
    #[must_use]
    pub fn reporter(mut self, reporter: Arc<dyn HealthReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Set the per-component command timeout.
    #[must_use]
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set the poller knobs.
    #[must_use]
    pub fn poller_settings(mut self, settings: PollerSettings) -> Self {
        self.poller = settings;
        self
    }

    /// Build the broker. In external mode this spawns the poll loop, so it
    /// must run inside a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Internal`] in external mode without an
    /// approval service or with a zero poll interval.
    pub fn build(self) -> BrokerResult<AuthorizationBroker> {
        let health = Arc::new(HealthController::new(self.reporter));
        let applier = ChangeApplier::new(self.commander, self.command_timeout);
        let (outcomes, _) = broadcast::channel(OUTCOME_CHANNEL_CAPACITY);
        let (shutdown, _) = broadcast::channel(1);
        let mut tasks = Vec::new();

        let decider = match self.mode {
            DecisionMode::Auto => Decider::Auto(AutoApprover::new(applier)),
            DecisionMode::External => {
                let service = self.approval.ok_or_else(|| BrokerError::Internal {
                    reason: "external mode requires an approval service".to_string(),
                })?;
                if self.poller.poll_interval.is_zero() {
                    return Err(BrokerError::Internal {
                        reason: "poll interval must be greater than zero".to_string(),
                    });
                }
                let (outcome_tx, outcome_rx) = mpsc::channel(POLLER_OUTCOME_CAPACITY);
                let (handle, poller) = ApprovalPoller::spawn(
                    service,
                    applier,
                    Arc::clone(&health),
                    self.poller,
                    outcome_tx,
                    shutdown.subscribe(),
                );
                tasks.push(poller);
                tasks.push(spawn_outcome_pump(
                    outcome_rx,
                    Arc::clone(&health),
                    outcomes.clone(),
                ));
                Decider::External(handle)
            },
        };

        info!(
            mode = %decider.mode(),
            components = self.registry.len(),
            "authorization broker ready"
        );

        Ok(AuthorizationBroker {
            registry: Arc::new(self.registry),
            decider: Arc::new(decider),
            health,
            outcomes,
            shutdown,
            tasks: Mutex::new(tasks),
        })
    }
}

/// Folds poller outcomes into health until the poller hangs up.
fn spawn_outcome_pump(
    mut rx: mpsc::Receiver<RequestOutcome>,
    health: Arc<HealthController>,
    outcomes: broadcast::Sender<RequestOutcome>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(outcome) = rx.recv().await {
            publish(&health, &outcomes, outcome);
        }
        debug!("outcome pump exiting");
    })
}

fn publish(
    health: &HealthController,
    outcomes: &broadcast::Sender<RequestOutcome>,
    outcome: RequestOutcome,
) {
    health.observe(&outcome);
    info!(
        request_id = %outcome.request_id(),
        disposition = %outcome.disposition(),
        success = outcome.is_success(),
        "{}",
        outcome.summary()
    );
    // No subscribers is fine.
    let _ = outcomes.send(outcome);
}

/// The authorization broker.
pub struct AuthorizationBroker {
    registry: Arc<ComponentRegistry>,
    decider: Arc<Decider>,
    health: Arc<HealthController>,
    outcomes: broadcast::Sender<RequestOutcome>,
    shutdown: broadcast::Sender<()>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for AuthorizationBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationBroker")
            .field("mode", &self.decider.mode())
            .field("health", &self.health.snapshot().state)
            .finish_non_exhaustive()
    }
}

impl AuthorizationBroker {
    /// Start building a broker.
    #[must_use]
    pub fn builder(
        registry: ComponentRegistry,
        commander: Arc<dyn ComponentCommander>,
    ) -> BrokerBuilder {
        BrokerBuilder::new(registry, commander)
    }

    /// Validate and route one inbound request.
    ///
    /// In auto mode the request is applied before this returns. Work runs
    /// on its own task: if the caller goes away, commands already issued
    /// still complete and the outcome is still recorded.
    ///
    /// # Errors
    ///
    /// - [`BrokerError::InvalidRequest`] for malformed or unknown names.
    /// - [`BrokerError::NotAccepting`] while the broker is faulted.
    /// - [`BrokerError::DuplicateRequest`], [`BrokerError::SubmissionFailed`]
    ///   and [`BrokerError::Shutdown`] from the decision path.
    pub async fn handle_request(&self, raw: &RawAuthorizationRequest) -> BrokerResult<Submission> {
        let request = validate(raw, &self.registry).inspect_err(|e| {
            warn!(requester = %raw.requester, error = %e, "rejected invalid request");
        })?;

        if let Some(reason) = self.health.fault_reason() {
            warn!(request_id = %request.id, reason = %reason, "broker faulted, request refused");
            return Err(BrokerError::NotAccepting { reason });
        }

        let span = info_span!(
            "authorization_request",
            request_id = %request.id,
            requester = %request.requester,
        );
        let decider = Arc::clone(&self.decider);
        let health = Arc::clone(&self.health);
        let outcomes = self.outcomes.clone();

        let task = tokio::spawn(
            async move {
                let submission = decider.submit(request).await?;
                if let Submission::Decided(outcome) = &submission {
                    publish(&health, &outcomes, outcome.clone());
                }
                Ok(submission)
            }
            .instrument(span),
        );

        task.await.map_err(|e| BrokerError::Internal {
            reason: e.to_string(),
        })?
    }

    /// Current broker health.
    #[must_use]
    pub fn health(&self) -> HealthSnapshot {
        self.health.snapshot()
    }

    /// Operator recovery: return to Normal.
    pub fn reset(&self) -> HealthSnapshot {
        info!("broker reset requested");
        self.health.reset()
    }

    /// Subscribe to every finished [`RequestOutcome`].
    #[must_use]
    pub fn subscribe_outcomes(&self) -> broadcast::Receiver<RequestOutcome> {
        self.outcomes.subscribe()
    }

    /// Decisions waiting on the approval service. Always empty in auto
    /// mode.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Shutdown`] once the poller has stopped.
    pub async fn pending(&self) -> BrokerResult<Vec<PendingInfo>> {
        match self.decider.as_ref() {
            Decider::Auto(_) => Ok(Vec::new()),
            Decider::External(poller) => poller.pending().await,
        }
    }

    /// Every authorizable component name.
    #[must_use]
    pub fn components(&self) -> Vec<ComponentName> {
        self.registry.all_names().into_iter().collect()
    }

    /// The component registry.
    #[must_use]
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// The configured decision path.
    #[must_use]
    pub fn mode(&self) -> DecisionMode {
        self.decider.mode()
    }

    /// Stop background work. The poller finishes its current cycle and the
    /// outcomes it produced are still published.
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(());
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(|e| {
            warn!("broker task list lock poisoned, recovering");
            e.into_inner()
        }));
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "broker task failed during shutdown");
            }
        }
        info!("authorization broker stopped");
    }
}

#[cfg(test)]
#[path = "broker_tests.rs"]
mod tests;
