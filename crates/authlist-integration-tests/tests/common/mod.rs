//! Shared broker harnesses for integration tests.

use std::sync::Arc;
use std::time::Duration;

use authlist_broker::{AuthorizationBroker, DecisionMode, PollerSettings, Submission};
use authlist_core::{RequestOutcome, RetryConfig};
use authlist_test::{MockApprovalService, MockCommander, RecordingReporter, test_registry};

/// Per-command timeout used by every harness.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(1);

/// A broker wired to mocks, with handles kept for scripting and assertions.
#[allow(dead_code)]
pub struct Harness {
    /// The broker under test.
    pub broker: Arc<AuthorizationBroker>,
    /// Scripted target components.
    pub commander: MockCommander,
    /// Scripted approval service (unused in auto mode).
    pub service: MockApprovalService,
    /// Every health change the broker pushed.
    pub reporter: RecordingReporter,
}

#[allow(dead_code)]
impl Harness {
    /// Auto-approval broker over `commander`.
    pub fn auto(commander: MockCommander) -> Self {
        let reporter = RecordingReporter::new();
        let broker = AuthorizationBroker::builder(test_registry(), Arc::new(commander.clone()))
            .command_timeout(COMMAND_TIMEOUT)
            .reporter(Arc::new(reporter.clone()))
            .build()
            .unwrap();
        Self {
            broker: Arc::new(broker),
            commander,
            service: MockApprovalService::new(),
            reporter,
        }
    }

    /// External-approval broker with [`poller_settings`]. Must be called
    /// inside a runtime.
    pub fn external(commander: MockCommander) -> Self {
        Self::external_with(commander, poller_settings())
    }

    /// External-approval broker with custom poller settings.
    pub fn external_with(commander: MockCommander, settings: PollerSettings) -> Self {
        let service = MockApprovalService::new();
        let reporter = RecordingReporter::new();
        let broker = AuthorizationBroker::builder(test_registry(), Arc::new(commander.clone()))
            .mode(DecisionMode::External)
            .approval_service(Arc::new(service.clone()))
            .command_timeout(COMMAND_TIMEOUT)
            .reporter(Arc::new(reporter.clone()))
            .poller_settings(settings)
            .build()
            .unwrap();
        Self {
            broker: Arc::new(broker),
            commander,
            service,
            reporter,
        }
    }
}

/// One-second cycles, a one-minute approval timeout, a threshold of two
/// failing cycles and a single submission attempt.
#[allow(dead_code)]
pub fn poller_settings() -> PollerSettings {
    PollerSettings {
        poll_interval: Duration::from_secs(1),
        approval_timeout: Duration::from_secs(60),
        failure_threshold: 2,
        submission: RetryConfig::once(),
        service_timeout: Duration::from_secs(2),
    }
}

/// Unwrap a submission that must have been decided in the call.
#[allow(dead_code)]
pub fn decided(submission: Submission) -> RequestOutcome {
    match submission {
        Submission::Decided(outcome) => outcome,
        other => panic!("expected a decided submission, got {other:?}"),
    }
}
