//! Scripted collaborators for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use authlist_core::{
    AuthorizationRequest, ComponentName, ComponentRegistry, Principal, RegistryEntry, RequestId,
    RequestOutcome,
};

use crate::approval::{ApprovalError, ApprovalService, DecisionStatus, ReferenceToken};
use crate::commander::{AuthListUpdate, CommandError, ComponentCommander};
use crate::health::{HealthChange, HealthReporter, HealthSnapshot};

/// Build a request without going through validation.
pub(crate) fn request(
    requester: &str,
    authorize: &[&str],
    unauthorize: &[&str],
) -> AuthorizationRequest {
    let names = |list: &[&str]| list.iter().map(|n| n.parse::<ComponentName>().unwrap()).collect();
    AuthorizationRequest {
        id: RequestId::new(),
        requester: Principal::parse(requester).unwrap(),
        authorize: names(authorize),
        unauthorize: names(unauthorize),
        received_at: Utc::now(),
    }
}

/// `ATDome`, `Foo` and `Test:1..=10`.
pub(crate) fn registry() -> ComponentRegistry {
    ComponentRegistry::new([
        RegistryEntry::new("ATDome"),
        RegistryEntry::new("Foo"),
        RegistryEntry::indexed("Test", 1, 10),
    ])
    .unwrap()
}

enum Script {
    Fail(CommandError),
    Hang,
    Delay(Duration),
}

/// Commander that succeeds unless told otherwise for a component.
#[derive(Default)]
pub(crate) struct ScriptedCommander {
    scripts: Mutex<HashMap<String, Script>>,
    sent: Mutex<Vec<(String, AuthListUpdate)>>,
}

impl ScriptedCommander {
    pub(crate) fn fail(&self, component: &str, error: CommandError) {
        self.script(component, Script::Fail(error));
    }

    pub(crate) fn hang(&self, component: &str) {
        self.script(component, Script::Hang);
    }

    pub(crate) fn delay(&self, component: &str, delay: Duration) {
        self.script(component, Script::Delay(delay));
    }

    pub(crate) fn sent(&self) -> Vec<(String, AuthListUpdate)> {
        self.sent.lock().unwrap().clone()
    }

    fn script(&self, component: &str, script: Script) {
        self.scripts
            .lock()
            .unwrap()
            .insert(component.to_string(), script);
    }
}

#[async_trait]
impl ComponentCommander for ScriptedCommander {
    async fn send_auth_list_update(
        &self,
        component: &ComponentName,
        update: &AuthListUpdate,
    ) -> Result<(), CommandError> {
        let name = component.to_string();
        self.sent.lock().unwrap().push((name.clone(), update.clone()));

        let action = match self.scripts.lock().unwrap().get(&name) {
            None => return Ok(()),
            Some(Script::Fail(e)) => return Err(e.clone()),
            Some(Script::Hang) => None,
            Some(Script::Delay(d)) => Some(*d),
        };
        match action {
            Some(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            },
            None => std::future::pending().await,
        }
    }
}

/// Approval service whose answers are set by the test.
///
/// Tokens are `tok-0`, `tok-1`, ... in submission order. Unknown tokens
/// poll as pending.
#[derive(Default)]
pub(crate) struct ScriptedApproval {
    next_token: AtomicU32,
    submit_failures: Mutex<VecDeque<ApprovalError>>,
    submitted: Mutex<Vec<AuthorizationRequest>>,
    statuses: Mutex<HashMap<String, DecisionStatus>>,
    poll_error: Mutex<Option<ApprovalError>>,
    polls: AtomicU32,
    reports: Mutex<Vec<(String, bool)>>,
}

impl ScriptedApproval {
    /// Fail the next `times` submissions with `error`.
    pub(crate) fn fail_submissions(&self, times: usize, error: ApprovalError) {
        self.submit_failures
            .lock()
            .unwrap()
            .extend(std::iter::repeat_n(error, times));
    }

    /// Fail every poll with `error` until [`Self::heal_polls`].
    pub(crate) fn fail_polls(&self, error: ApprovalError) {
        *self.poll_error.lock().unwrap() = Some(error);
    }

    pub(crate) fn heal_polls(&self) {
        *self.poll_error.lock().unwrap() = None;
    }

    pub(crate) fn decide(&self, token: &str, status: DecisionStatus) {
        self.statuses
            .lock()
            .unwrap()
            .insert(token.to_string(), status);
    }

    pub(crate) fn submitted(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }

    pub(crate) fn polls(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }

    pub(crate) fn reports(&self) -> Vec<(String, bool)> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApprovalService for ScriptedApproval {
    async fn submit(&self, request: &AuthorizationRequest) -> Result<ReferenceToken, ApprovalError> {
        if let Some(error) = self.submit_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        self.submitted.lock().unwrap().push(request.clone());
        let n = self.next_token.fetch_add(1, Ordering::SeqCst);
        Ok(ReferenceToken::new(format!("tok-{n}")))
    }

    async fn poll(&self, token: &ReferenceToken) -> Result<DecisionStatus, ApprovalError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.poll_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .get(token.as_str())
            .copied()
            .unwrap_or(DecisionStatus::Pending))
    }

    async fn report_execution(
        &self,
        token: &ReferenceToken,
        outcome: &RequestOutcome,
    ) -> Result<(), ApprovalError> {
        self.reports
            .lock()
            .unwrap()
            .push((token.to_string(), outcome.is_success()));
        Ok(())
    }
}

/// Reporter that keeps every change.
#[derive(Default)]
pub(crate) struct RecordingReporter {
    changes: Mutex<Vec<HealthChange>>,
}

impl RecordingReporter {
    pub(crate) fn changes(&self) -> Vec<HealthChange> {
        self.changes.lock().unwrap().clone()
    }
}

impl HealthReporter for RecordingReporter {
    fn report(&self, change: &HealthChange, _snapshot: &HealthSnapshot) {
        self.changes.lock().unwrap().push(change.clone());
    }
}
