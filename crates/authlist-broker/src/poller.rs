//! External approval poller.
//!
//! One background task owns the pending set. Everything else talks to it
//! through a command channel: [`PollerHandle::submit`] reserves the request
//! key, hands the request to the approval service with bounded retries, then
//! asks the task to track the returned token. On every tick the task polls
//! each pending decision in submission order and resolves the terminal ones.
//! While a cycle waits on the approval service or on components, the task
//! keeps answering commands, so submissions never queue behind a slow cycle.
//!
//! Per decision:
//!
//! ```text
//! Submitted ──► (Polling)* ──► Approved ──► applied
//!                          ├─► Rejected / NotFound
//!                          └─► Expired (older than the approval timeout)
//! ```
//!
//! A communication error keeps the decision pending. Every cycle with at
//! least one error bumps a consecutive-failure counter; past the threshold
//! the broker is faulted once, and polling carries on.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use authlist_core::outcome::{REASON_APPROVAL_TIMEOUT, REASON_NOT_FOUND, REASON_REJECTED};
use authlist_core::{
    AuthorizationRequest, BrokerError, BrokerResult, Disposition, RequestId, RequestKey,
    RequestOutcome, RetryConfig, RetryOutcome, retry,
};

use crate::applier::ChangeApplier;
use crate::approval::{ApprovalError, ApprovalService, DecisionStatus, ReferenceToken};
use crate::health::HealthController;

/// Capacity of the poller command channel.
const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Timing and budget knobs for the poller.
#[derive(Debug, Clone, PartialEq)]
pub struct PollerSettings {
    /// Time between poll cycles. Must be non-zero.
    pub poll_interval: Duration,
    /// Age after which a pending decision expires.
    pub approval_timeout: Duration,
    /// Consecutive failing cycles tolerated before the broker faults.
    pub failure_threshold: u32,
    /// Backoff for handing requests to the service.
    pub submission: RetryConfig,
    /// Bound on any single call to the approval service.
    pub service_timeout: Duration,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            approval_timeout: Duration::from_secs(600),
            failure_threshold: 5,
            submission: RetryConfig::default(),
            service_timeout: Duration::from_secs(10),
        }
    }
}

/// A request waiting for an external decision.
#[derive(Debug, Clone)]
pub struct PendingDecision {
    /// The request as submitted.
    pub request: AuthorizationRequest,
    /// Token the service assigned to it.
    pub token: ReferenceToken,
    /// When the service accepted it.
    pub submitted_at: Instant,
}

impl PendingDecision {
    fn info(&self) -> PendingInfo {
        PendingInfo {
            request_id: self.request.id,
            requester: self.request.requester.to_string(),
            authorize: self.request.authorize.iter().map(ToString::to_string).collect(),
            unauthorize: self
                .request
                .unauthorize
                .iter()
                .map(ToString::to_string)
                .collect(),
            token: self.token.clone(),
            age_secs: self.submitted_at.elapsed().as_secs(),
        }
    }
}

/// Read-only view of a pending decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingInfo {
    /// Broker-side request id.
    pub request_id: RequestId,
    /// Who asked.
    pub requester: String,
    /// Components to authorize.
    pub authorize: Vec<String>,
    /// Components to revoke.
    pub unauthorize: Vec<String>,
    /// Approval service token.
    pub token: ReferenceToken,
    /// Seconds since submission.
    pub age_secs: u64,
}

enum PollerCommand {
    Reserve {
        key: RequestKey,
        reply: oneshot::Sender<bool>,
    },
    Release {
        key: RequestKey,
    },
    Track(PendingDecision),
    List {
        reply: oneshot::Sender<Vec<PendingInfo>>,
    },
}

/// Cloneable front end of the poller task.
#[derive(Clone)]
pub struct PollerHandle {
    commands: mpsc::Sender<PollerCommand>,
    service: Arc<dyn ApprovalService>,
    submission: RetryConfig,
    service_timeout: Duration,
}

impl std::fmt::Debug for PollerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollerHandle")
            .field("submission", &self.submission)
            .field("service_timeout", &self.service_timeout)
            .finish_non_exhaustive()
    }
}

impl PollerHandle {
    /// Hand `request` to the approval service and start tracking it.
    ///
    /// The caller learns synchronously whether deferred processing started.
    ///
    /// # Errors
    ///
    /// - [`BrokerError::DuplicateRequest`] if the same key is pending,
    ///   being submitted, or being applied.
    /// - [`BrokerError::SubmissionFailed`] once the retry budget is spent;
    ///   nothing is tracked in that case.
    /// - [`BrokerError::Shutdown`] if the poller task is gone.
    pub async fn submit(&self, request: AuthorizationRequest) -> BrokerResult<ReferenceToken> {
        let key = request.key();
        let (reply, reserved) = oneshot::channel();
        self.send(PollerCommand::Reserve {
            key: key.clone(),
            reply,
        })
        .await?;
        if !reserved.await.map_err(|_| BrokerError::Shutdown)? {
            return Err(BrokerError::DuplicateRequest { key });
        }

        let service: &dyn ApprovalService = self.service.as_ref();
        let per_attempt = self.service_timeout;
        let req = &request;
        let submitted = retry(
            &self.submission,
            move |attempt| async move {
                debug!(request_id = %req.id, attempt, "submitting for approval");
                tokio::time::timeout(per_attempt, service.submit(req))
                    .await
                    .unwrap_or(Err(ApprovalError::Timeout))
            },
            ApprovalError::is_retryable,
        )
        .await;

        match submitted {
            RetryOutcome::Success(token) => {
                info!(request_id = %request.id, token = %token, "submitted for approval");
                self.send(PollerCommand::Track(PendingDecision {
                    request,
                    token: token.clone(),
                    submitted_at: Instant::now(),
                }))
                .await?;
                Ok(token)
            },
            RetryOutcome::Exhausted { error, attempts } => {
                warn!(
                    request_id = %request.id,
                    attempts,
                    error = %error,
                    "approval submission failed"
                );
                // Best effort: a stopped poller has nothing left to release.
                let _ = self.commands.send(PollerCommand::Release { key }).await;
                Err(BrokerError::SubmissionFailed {
                    attempts,
                    reason: error.to_string(),
                })
            },
        }
    }

    /// Snapshot of the decisions awaiting the service, in submission order.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Shutdown`] if the poller task is gone.
    pub async fn pending(&self) -> BrokerResult<Vec<PendingInfo>> {
        let (reply, list) = oneshot::channel();
        self.send(PollerCommand::List { reply }).await?;
        list.await.map_err(|_| BrokerError::Shutdown)
    }

    async fn send(&self, command: PollerCommand) -> BrokerResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| BrokerError::Shutdown)
    }
}

/// The background task that owns every [`PendingDecision`].
pub struct ApprovalPoller {
    service: Arc<dyn ApprovalService>,
    applier: ChangeApplier,
    health: Arc<HealthController>,
    settings: PollerSettings,
    commands: mpsc::Receiver<PollerCommand>,
    outcomes: mpsc::Sender<RequestOutcome>,
    reserved: HashSet<RequestKey>,
    pending: Vec<PendingDecision>,
    consecutive_failures: u32,
    fault_raised: bool,
}

impl ApprovalPoller {
    /// Spawn the poll loop.
    ///
    /// Finished outcomes go to `outcomes`. The loop stops when `shutdown`
    /// fires or every [`PollerHandle`] is dropped; a cycle in progress is
    /// always completed first. `settings.poll_interval` must be non-zero.
    #[must_use]
    pub fn spawn(
        service: Arc<dyn ApprovalService>,
        applier: ChangeApplier,
        health: Arc<HealthController>,
        settings: PollerSettings,
        outcomes: mpsc::Sender<RequestOutcome>,
        shutdown: broadcast::Receiver<()>,
    ) -> (PollerHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let handle = PollerHandle {
            commands: tx,
            service: Arc::clone(&service),
            submission: settings.submission.clone(),
            service_timeout: settings.service_timeout,
        };
        let poller = Self {
            service,
            applier,
            health,
            settings,
            commands: rx,
            outcomes,
            reserved: HashSet::new(),
            pending: Vec::new(),
            consecutive_failures: 0,
            fault_raised: false,
        };
        (handle, tokio::spawn(poller.run(shutdown)))
    }

    async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        let period = self.settings.poll_interval;
        let first_tick = Instant::now().checked_add(period).unwrap_or_else(Instant::now);
        let mut ticker = tokio::time::interval_at(first_tick, period);
        info!(interval_ms = period.as_millis(), "approval poller started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    info!(pending = self.pending.len(), "approval poller received shutdown signal");
                    break;
                }
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        info!("all poller handles dropped, poller exiting");
                        break;
                    };
                    self.handle_command(command);
                }
                _ = ticker.tick() => self.poll_cycle().await,
            }
        }
    }

    fn handle_command(&mut self, command: PollerCommand) {
        match command {
            PollerCommand::Reserve { key, reply } => {
                let inserted = self.reserved.insert(key);
                let _ = reply.send(inserted);
            },
            PollerCommand::Release { key } => {
                self.reserved.remove(&key);
            },
            PollerCommand::Track(decision) => {
                debug!(token = %decision.token, "tracking pending decision");
                self.pending.push(decision);
            },
            PollerCommand::List { reply } => {
                let _ = reply.send(self.pending.iter().map(PendingDecision::info).collect());
            },
        }
    }

    /// Await `io` while still answering handle commands.
    ///
    /// `io` must not borrow the poller; callers move clones of what it needs
    /// into it.
    async fn serve_during<F: Future>(&mut self, io: F) -> F::Output {
        tokio::pin!(io);
        loop {
            tokio::select! {
                biased;
                output = &mut io => return output,
                Some(command) = self.commands.recv() => self.handle_command(command),
            }
        }
    }

    /// One pass over the pending set, in submission order.
    ///
    /// Works on a snapshot. Decisions tracked while the cycle runs are
    /// appended to the pending set and wait for the next cycle.
    async fn poll_cycle(&mut self) {
        if self.pending.is_empty() {
            return;
        }

        let mut polled = false;
        let mut last_error: Option<ApprovalError> = None;

        for decision in self.pending.clone() {
            if decision.submitted_at.elapsed() > self.settings.approval_timeout {
                info!(request_id = %decision.request.id, token = %decision.token, "approval timed out");
                self.untrack(&decision.token);
                let outcome = RequestOutcome::not_applied(
                    decision.request,
                    Disposition::Expired,
                    REASON_APPROVAL_TIMEOUT,
                );
                self.finish(outcome).await;
                continue;
            }

            polled = true;
            let service = Arc::clone(&self.service);
            let token = decision.token.clone();
            let limit = self.settings.service_timeout;
            let status = self
                .serve_during(async move {
                    tokio::time::timeout(limit, service.poll(&token))
                        .await
                        .unwrap_or(Err(ApprovalError::Timeout))
                })
                .await;

            match status {
                Ok(DecisionStatus::Pending) => {},
                Ok(DecisionStatus::Approved) => self.apply_approved(decision).await,
                Ok(DecisionStatus::Rejected) => {
                    info!(request_id = %decision.request.id, "rejected by approver");
                    self.untrack(&decision.token);
                    let outcome = RequestOutcome::not_applied(
                        decision.request,
                        Disposition::Rejected,
                        REASON_REJECTED,
                    );
                    self.finish(outcome).await;
                },
                Ok(DecisionStatus::NotFound) => {
                    warn!(request_id = %decision.request.id, token = %decision.token, "approval service does not know the token");
                    self.untrack(&decision.token);
                    let outcome = RequestOutcome::not_applied(
                        decision.request,
                        Disposition::Rejected,
                        REASON_NOT_FOUND,
                    );
                    self.finish(outcome).await;
                },
                Err(e) => {
                    warn!(token = %decision.token, error = %e, "poll failed, will retry next cycle");
                    last_error = Some(e);
                },
            }
        }

        self.record_cycle(polled, last_error);
    }

    async fn apply_approved(&mut self, decision: PendingDecision) {
        let PendingDecision { request, token, .. } = decision;
        info!(request_id = %request.id, token = %token, "approved, applying");
        self.untrack(&token);

        let applier = self.applier.clone();
        let service = Arc::clone(&self.service);
        let limit = self.settings.service_timeout;
        let outcome = self
            .serve_during(async move {
                let outcome = applier.apply(request).await;
                let reported = tokio::time::timeout(limit, service.report_execution(&token, &outcome))
                    .await
                    .unwrap_or(Err(ApprovalError::Timeout));
                if let Err(e) = reported {
                    warn!(token = %token, error = %e, "failed to report execution result");
                }
                outcome
            })
            .await;

        self.finish(outcome).await;
    }

    /// Drop a resolved decision from the pending set. Its key stays
    /// reserved until [`Self::finish`].
    fn untrack(&mut self, token: &ReferenceToken) {
        self.pending.retain(|d| d.token != *token);
    }

    async fn finish(&mut self, outcome: RequestOutcome) {
        self.reserved.remove(&outcome.request().key());
        if self.outcomes.send(outcome).await.is_err() {
            warn!("outcome receiver dropped, outcome discarded");
        }
    }

    fn record_cycle(&mut self, polled: bool, last_error: Option<ApprovalError>) {
        match last_error {
            Some(error) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                let over = self.consecutive_failures > self.settings.failure_threshold;
                // Fault again if an operator reset while the service is still down.
                if over && (!self.fault_raised || !self.health.is_faulted()) {
                    warn!(
                        failures = self.consecutive_failures,
                        threshold = self.settings.failure_threshold,
                        "approval service failure threshold exceeded"
                    );
                    self.health.observe_fault(error.to_string());
                    self.fault_raised = true;
                }
            },
            None if polled => {
                if self.consecutive_failures > 0 {
                    info!(
                        failures = self.consecutive_failures,
                        "approval service reachable again"
                    );
                }
                self.consecutive_failures = 0;
                self.fault_raised = false;
            },
            None => {},
        }
    }
}

#[cfg(test)]
#[path = "poller_tests.rs"]
mod tests;
