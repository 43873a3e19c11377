//! Mock implementations for testing.
//!
//! All mocks use `std::sync::Mutex` internally and are cheap to clone: a
//! clone shares state with the original, so a test can keep one handle for
//! scripting and assertions while the broker owns another.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use authlist_broker::{
    ApprovalError, ApprovalService, AuthListUpdate, CommandError, ComponentCommander,
    DecisionStatus, HealthChange, HealthReporter, HealthSnapshot, ReferenceToken,
};
use authlist_core::{AuthorizationRequest, ComponentName, RequestOutcome};

#[derive(Debug, Clone)]
enum Behavior {
    Fail(CommandError),
    Hang,
    Delay(Duration),
}

/// One update captured by [`MockCommander`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentUpdate {
    /// Component display name.
    pub component: String,
    /// The update that was sent.
    pub update: AuthListUpdate,
}

/// Mock implementation of the `ComponentCommander` trait.
///
/// Every component acknowledges immediately unless scripted otherwise.
#[derive(Debug, Clone, Default)]
pub struct MockCommander {
    behaviors: Arc<Mutex<HashMap<String, Behavior>>>,
    sent: Arc<Mutex<Vec<SentUpdate>>>,
}

impl MockCommander {
    /// Create a commander where every component succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every command to `component` with `error`.
    #[must_use]
    pub fn with_failure(self, component: &str, error: CommandError) -> Self {
        self.fail(component, error);
        self
    }

    /// Never answer commands to `component`.
    #[must_use]
    pub fn with_hang(self, component: &str) -> Self {
        self.hang(component);
        self
    }

    /// Answer commands to `component` after `delay`.
    #[must_use]
    pub fn with_delay(self, component: &str, delay: Duration) -> Self {
        self.set(component, Behavior::Delay(delay));
        self
    }

    /// Fail every later command to `component` with `error`.
    pub fn fail(&self, component: &str, error: CommandError) {
        self.set(component, Behavior::Fail(error));
    }

    /// Never answer later commands to `component`.
    pub fn hang(&self, component: &str) {
        self.set(component, Behavior::Hang);
    }

    /// Let `component` succeed again.
    pub fn heal(&self, component: &str) {
        if let Ok(mut guard) = self.behaviors.lock() {
            guard.remove(component);
        }
    }

    /// Every update sent so far, in order.
    #[must_use]
    pub fn get_sent(&self) -> Vec<SentUpdate> {
        self.sent.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Updates sent to one component.
    #[must_use]
    pub fn get_sent_to(&self, component: &str) -> Vec<AuthListUpdate> {
        self.sent
            .lock()
            .map(|g| {
                g.iter()
                    .filter(|s| s.component == component)
                    .map(|s| s.update.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of updates sent so far.
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.sent.lock().map(|g| g.len()).unwrap_or(0)
    }

    fn set(&self, component: &str, behavior: Behavior) {
        if let Ok(mut guard) = self.behaviors.lock() {
            guard.insert(component.to_string(), behavior);
        }
    }
}

#[async_trait]
impl ComponentCommander for MockCommander {
    async fn send_auth_list_update(
        &self,
        component: &ComponentName,
        update: &AuthListUpdate,
    ) -> Result<(), CommandError> {
        let name = component.to_string();
        if let Ok(mut guard) = self.sent.lock() {
            guard.push(SentUpdate {
                component: name.clone(),
                update: update.clone(),
            });
        }

        let behavior = self
            .behaviors
            .lock()
            .ok()
            .and_then(|g| g.get(&name).cloned());
        match behavior {
            None => Ok(()),
            Some(Behavior::Fail(error)) => Err(error),
            Some(Behavior::Delay(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(())
            },
            Some(Behavior::Hang) => std::future::pending().await,
        }
    }
}

/// Mock implementation of the `ApprovalService` trait.
///
/// Tokens are `tok-0`, `tok-1`, ... in submission order. Tokens without a
/// scripted decision poll as pending.
#[derive(Debug, Clone, Default)]
pub struct MockApprovalService {
    next_token: Arc<AtomicU32>,
    submit_failures: Arc<Mutex<VecDeque<ApprovalError>>>,
    submitted: Arc<Mutex<Vec<AuthorizationRequest>>>,
    decisions: Arc<Mutex<HashMap<String, DecisionStatus>>>,
    poll_error: Arc<Mutex<Option<ApprovalError>>>,
    polls: Arc<AtomicU32>,
    reports: Arc<Mutex<Vec<(ReferenceToken, RequestOutcome)>>>,
}

impl MockApprovalService {
    /// Create a service that accepts every submission.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` submissions with `error`.
    pub fn fail_submissions(&self, times: usize, error: ApprovalError) {
        if let Ok(mut guard) = self.submit_failures.lock() {
            guard.extend(std::iter::repeat_n(error, times));
        }
    }

    /// Fail every poll with `error` until [`Self::recover`].
    pub fn go_down(&self, error: ApprovalError) {
        if let Ok(mut guard) = self.poll_error.lock() {
            *guard = Some(error);
        }
    }

    /// Answer polls normally again.
    pub fn recover(&self) {
        if let Ok(mut guard) = self.poll_error.lock() {
            *guard = None;
        }
    }

    /// Set the decision returned for `token`.
    pub fn decide(&self, token: &str, status: DecisionStatus) {
        if let Ok(mut guard) = self.decisions.lock() {
            guard.insert(token.to_string(), status);
        }
    }

    /// Requests accepted so far.
    #[must_use]
    pub fn get_submitted(&self) -> Vec<AuthorizationRequest> {
        self.submitted.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Number of polls answered or failed so far.
    #[must_use]
    pub fn poll_count(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }

    /// Execution reports received so far.
    #[must_use]
    pub fn get_reports(&self) -> Vec<(ReferenceToken, RequestOutcome)> {
        self.reports.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ApprovalService for MockApprovalService {
    async fn submit(&self, request: &AuthorizationRequest) -> Result<ReferenceToken, ApprovalError> {
        let failure = self
            .submit_failures
            .lock()
            .ok()
            .and_then(|mut g| g.pop_front());
        if let Some(error) = failure {
            return Err(error);
        }
        if let Ok(mut guard) = self.submitted.lock() {
            guard.push(request.clone());
        }
        let n = self.next_token.fetch_add(1, Ordering::SeqCst);
        Ok(ReferenceToken::new(format!("tok-{n}")))
    }

    async fn poll(&self, token: &ReferenceToken) -> Result<DecisionStatus, ApprovalError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.poll_error.lock().ok().and_then(|g| g.clone()) {
            return Err(error);
        }
        Ok(self
            .decisions
            .lock()
            .ok()
            .and_then(|g| g.get(token.as_str()).copied())
            .unwrap_or(DecisionStatus::Pending))
    }

    async fn report_execution(
        &self,
        token: &ReferenceToken,
        outcome: &RequestOutcome,
    ) -> Result<(), ApprovalError> {
        if let Ok(mut guard) = self.reports.lock() {
            guard.push((token.clone(), outcome.clone()));
        }
        Ok(())
    }
}

/// Health reporter that keeps every change it is given.
#[derive(Debug, Clone, Default)]
pub struct RecordingReporter {
    changes: Arc<Mutex<Vec<(HealthChange, HealthSnapshot)>>>,
}

impl RecordingReporter {
    /// Create an empty reporter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Changes reported so far, in order.
    #[must_use]
    pub fn get_changes(&self) -> Vec<HealthChange> {
        self.changes
            .lock()
            .map(|g| g.iter().map(|(c, _)| c.clone()).collect())
            .unwrap_or_default()
    }

    /// Snapshots that accompanied each change.
    #[must_use]
    pub fn get_snapshots(&self) -> Vec<HealthSnapshot> {
        self.changes
            .lock()
            .map(|g| g.iter().map(|(_, s)| s.clone()).collect())
            .unwrap_or_default()
    }

    /// Number of Normal → Faulted transitions.
    #[must_use]
    pub fn fault_entries(&self) -> usize {
        self.changes
            .lock()
            .map(|g| {
                g.iter()
                    .filter(|(c, _)| matches!(c, HealthChange::EnteredFault { .. }))
                    .count()
            })
            .unwrap_or(0)
    }
}

impl HealthReporter for RecordingReporter {
    fn report(&self, change: &HealthChange, snapshot: &HealthSnapshot) {
        if let Ok(mut guard) = self.changes.lock() {
            guard.push((change.clone(), snapshot.clone()));
        }
    }
}
