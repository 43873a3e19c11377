//! External-approval mode end to end: submission, polling, expiry, faults
//! and shutdown.

#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

mod common;

use std::time::Duration;

use tokio::time::{Instant, sleep};

use authlist_broker::{
    ApprovalError, BrokerHealth, CommandError, DecisionStatus, PollerSettings, Submission,
};
use authlist_core::{BrokerError, ComponentName, ComponentResult, Disposition, RetryConfig};
use authlist_test::{MockCommander, test_raw_request};

use common::{Harness, poller_settings};

fn name(text: &str) -> ComponentName {
    ComponentName::parse(text).unwrap()
}

fn token_of(submission: Submission) -> String {
    match submission {
        Submission::Deferred { token, .. } => token.as_str().to_string(),
        other => panic!("expected a deferred submission, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn approval_on_next_cycle_applies_exactly_once() {
    let h = Harness::external(MockCommander::new());
    let mut outcomes = h.broker.subscribe_outcomes();

    let token = token_of(
        h.broker
            .handle_request(&test_raw_request("userA", &["ATDome"], &["Foo"]))
            .await
            .unwrap(),
    );
    assert_eq!(h.broker.pending().await.unwrap().len(), 1);
    assert_eq!(h.commander.sent_count(), 0);

    h.service.decide(&token, DecisionStatus::Approved);
    let outcome = outcomes.recv().await.unwrap();

    assert_eq!(outcome.disposition(), Disposition::Applied);
    assert!(outcome.is_success());
    assert_eq!(h.commander.sent_count(), 2);
    assert!(h.broker.pending().await.unwrap().is_empty());

    let reports = h.service.get_reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].0.as_str(), token);

    // Later cycles must not apply it again.
    sleep(Duration::from_secs(5)).await;
    assert_eq!(h.commander.sent_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn duplicate_while_pending_is_not_tracked_twice() {
    let h = Harness::external(MockCommander::new());
    let raw = test_raw_request("userA@host", &["MTHexapod:1", "ATDome"], &[]);

    h.broker.handle_request(&raw).await.unwrap();
    let err = h.broker.handle_request(&raw).await.unwrap_err();

    assert!(matches!(err, BrokerError::DuplicateRequest { .. }));
    assert_eq!(h.broker.pending().await.unwrap().len(), 1);
    assert_eq!(h.service.get_submitted().len(), 1);

    // Same targets listed in another order is the same request.
    let reordered = test_raw_request("userA@host", &["ATDome", "MTHexapod:1"], &[]);
    assert!(matches!(
        h.broker.handle_request(&reordered).await.unwrap_err(),
        BrokerError::DuplicateRequest { .. }
    ));

    // A different requester is a different request.
    let other = test_raw_request("userB@host", &["MTHexapod:1", "ATDome"], &[]);
    assert!(h.broker.handle_request(&other).await.is_ok());
    assert_eq!(h.broker.pending().await.unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn resolved_request_may_be_submitted_again() {
    let h = Harness::external(MockCommander::new());
    let mut outcomes = h.broker.subscribe_outcomes();
    let raw = test_raw_request("userA", &["ATDome"], &[]);

    let token = token_of(h.broker.handle_request(&raw).await.unwrap());
    h.service.decide(&token, DecisionStatus::Rejected);
    outcomes.recv().await.unwrap();

    assert!(h.broker.handle_request(&raw).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn silent_service_resolves_as_approval_timeout() {
    let h = Harness::external_with(
        MockCommander::new(),
        PollerSettings {
            approval_timeout: Duration::from_secs(5),
            ..poller_settings()
        },
    );
    let mut outcomes = h.broker.subscribe_outcomes();
    let started = Instant::now();

    h.broker
        .handle_request(&test_raw_request("userA", &["ATDome", "Test:7"], &[]))
        .await
        .unwrap();
    let outcome = outcomes.recv().await.unwrap();

    assert!(started.elapsed() > Duration::from_secs(5));
    assert_eq!(outcome.disposition(), Disposition::Expired);
    assert_eq!(
        outcome.result_for(&name("Test:7")),
        Some(&ComponentResult::failed("approval timeout"))
    );
    assert_eq!(h.commander.sent_count(), 0);
    assert!(h.broker.pending().await.unwrap().is_empty());
    // Terminal non-grant outcomes are not system faults.
    assert_eq!(h.broker.health().state, BrokerHealth::Normal);
}

#[tokio::test(start_paused = true)]
async fn rejection_and_unknown_token_fail_every_target() {
    let h = Harness::external(MockCommander::new());
    let mut outcomes = h.broker.subscribe_outcomes();

    let rejected = token_of(
        h.broker
            .handle_request(&test_raw_request("userA", &["ATDome"], &["Foo"]))
            .await
            .unwrap(),
    );
    let unknown = token_of(
        h.broker
            .handle_request(&test_raw_request("userB", &["ATDome"], &[]))
            .await
            .unwrap(),
    );
    h.service.decide(&rejected, DecisionStatus::Rejected);
    h.service.decide(&unknown, DecisionStatus::NotFound);

    let first = outcomes.recv().await.unwrap();
    let second = outcomes.recv().await.unwrap();

    assert_eq!(first.disposition(), Disposition::Rejected);
    assert!(first.failed().all(|(_, reason)| reason == "rejected by approver"));
    assert_eq!(first.failed().count(), 2);
    assert_eq!(second.disposition(), Disposition::Rejected);
    assert_eq!(second.first_failure_reason(), Some("unknown to approver"));

    assert_eq!(h.commander.sent_count(), 0);
    assert!(h.service.get_reports().is_empty());
    assert_eq!(h.broker.health().state, BrokerHealth::Normal);
}

#[tokio::test(start_paused = true)]
async fn decisions_in_one_cycle_apply_in_submission_order() {
    let h = Harness::external(MockCommander::new());
    let mut outcomes = h.broker.subscribe_outcomes();

    let mut tokens = Vec::new();
    for requester in ["userA", "userB", "userC"] {
        tokens.push(token_of(
            h.broker
                .handle_request(&test_raw_request(requester, &["ATDome"], &[]))
                .await
                .unwrap(),
        ));
    }
    for token in tokens.iter().rev() {
        h.service.decide(token, DecisionStatus::Approved);
    }

    let mut order = Vec::new();
    for _ in 0..3 {
        order.push(outcomes.recv().await.unwrap().request().requester.to_string());
    }
    assert_eq!(order, ["userA", "userB", "userC"]);

    let sent: Vec<_> = h
        .commander
        .get_sent()
        .into_iter()
        .flat_map(|s| s.update.add_authorize)
        .collect();
    assert_eq!(sent, ["userA", "userB", "userC"]);
}

#[tokio::test(start_paused = true)]
async fn submission_failure_is_synchronous_and_untracked() {
    let h = Harness::external_with(
        MockCommander::new(),
        PollerSettings {
            submission: RetryConfig::exponential(
                2,
                Duration::from_millis(100),
                Duration::from_secs(1),
            ),
            ..poller_settings()
        },
    );
    h.service
        .fail_submissions(3, ApprovalError::Unreachable("connection refused".into()));

    let err = h
        .broker
        .handle_request(&test_raw_request("userA", &["ATDome"], &[]))
        .await
        .unwrap_err();

    assert!(matches!(err, BrokerError::SubmissionFailed { attempts: 3, .. }));
    assert!(h.broker.pending().await.unwrap().is_empty());
    assert!(h.service.get_submitted().is_empty());

    // The key was released, so a retry by the caller is accepted.
    assert!(h
        .broker
        .handle_request(&test_raw_request("userA", &["ATDome"], &[]))
        .await
        .is_ok());
}

#[tokio::test(start_paused = true)]
async fn transient_submission_error_is_retried() {
    let h = Harness::external_with(
        MockCommander::new(),
        PollerSettings {
            submission: RetryConfig::exponential(
                2,
                Duration::from_millis(100),
                Duration::from_secs(1),
            ),
            ..poller_settings()
        },
    );
    h.service.fail_submissions(2, ApprovalError::Timeout);

    let submission = h
        .broker
        .handle_request(&test_raw_request("userA", &["ATDome"], &[]))
        .await
        .unwrap();

    assert_eq!(token_of(submission), "tok-0");
    assert_eq!(h.service.get_submitted().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn unreachable_service_faults_once_past_threshold() {
    let h = Harness::external(MockCommander::new());
    let token = token_of(
        h.broker
            .handle_request(&test_raw_request("userA", &["ATDome"], &[]))
            .await
            .unwrap(),
    );
    h.service
        .go_down(ApprovalError::Unreachable("no route to host".into()));

    // Threshold 2: the third failing cycle (t = 3s) faults.
    sleep(Duration::from_millis(2500)).await;
    assert_eq!(h.broker.health().state, BrokerHealth::Normal);
    sleep(Duration::from_secs(1)).await;
    assert!(h.broker.health().is_faulted());
    assert_eq!(h.reporter.fault_entries(), 1);

    // Still polling, still pending, still faulted exactly once.
    sleep(Duration::from_secs(5)).await;
    assert_eq!(h.reporter.fault_entries(), 1);
    assert!(h.service.poll_count() >= 8);
    assert_eq!(h.broker.pending().await.unwrap().len(), 1);

    // A new request is refused while faulted.
    assert!(matches!(
        h.broker
            .handle_request(&test_raw_request("userB", &["Foo"], &[]))
            .await
            .unwrap_err(),
        BrokerError::NotAccepting { .. }
    ));

    // Service back, operator resets, the pending decision completes.
    h.service.recover();
    let mut outcomes = h.broker.subscribe_outcomes();
    h.broker.reset();
    h.service.decide(&token, DecisionStatus::Approved);
    let outcome = outcomes.recv().await.unwrap();
    assert!(outcome.is_success());
    assert_eq!(h.broker.health().state, BrokerHealth::Normal);
}

#[tokio::test(start_paused = true)]
async fn clean_cycle_resets_the_failure_count() {
    let h = Harness::external(MockCommander::new());
    h.broker
        .handle_request(&test_raw_request("userA", &["ATDome"], &[]))
        .await
        .unwrap();
    // Stay clear of the tick instants.
    sleep(Duration::from_millis(500)).await;

    for _ in 0..3 {
        h.service.go_down(ApprovalError::Timeout);
        sleep(Duration::from_secs(2)).await;
        h.service.recover();
        sleep(Duration::from_secs(1)).await;
    }

    assert_eq!(h.broker.health().state, BrokerHealth::Normal);
    assert_eq!(h.reporter.fault_entries(), 0);
}

#[tokio::test(start_paused = true)]
async fn command_failure_after_approval_faults_until_reset() {
    let commander =
        MockCommander::new().with_failure("Foo", CommandError::Rejected("not enabled".into()));
    let h = Harness::external(commander);
    let mut outcomes = h.broker.subscribe_outcomes();

    let failing = token_of(
        h.broker
            .handle_request(&test_raw_request("userA", &["Foo", "ATDome"], &[]))
            .await
            .unwrap(),
    );
    let clean = token_of(
        h.broker
            .handle_request(&test_raw_request("userB", &["ATDome"], &[]))
            .await
            .unwrap(),
    );

    h.service.decide(&failing, DecisionStatus::Approved);
    let outcome = outcomes.recv().await.unwrap();
    assert_eq!(
        outcome.result_for(&name("Foo")),
        Some(&ComponentResult::failed("rejected: not enabled"))
    );
    assert_eq!(
        outcome.result_for(&name("ATDome")),
        Some(&ComponentResult::Succeeded)
    );
    assert!(h.broker.health().is_faulted());

    // Pending decisions keep being applied while faulted; success does not
    // heal the broker.
    h.service.decide(&clean, DecisionStatus::Approved);
    assert!(outcomes.recv().await.unwrap().is_success());
    assert!(h.broker.health().is_faulted());

    assert_eq!(h.broker.reset().state, BrokerHealth::Normal);
}

#[tokio::test(start_paused = true)]
async fn shutdown_finishes_the_running_cycle() {
    let h = Harness::external(MockCommander::new().with_delay("ATDome", Duration::from_secs(2)));
    let mut outcomes = h.broker.subscribe_outcomes();

    let token = token_of(
        h.broker
            .handle_request(&test_raw_request("userA", &["ATDome"], &[]))
            .await
            .unwrap(),
    );
    h.service.decide(&token, DecisionStatus::Approved);

    // The first cycle runs at t = 1s and is applying until t = 3s.
    sleep(Duration::from_millis(1100)).await;
    assert_eq!(h.commander.sent_count(), 1);

    h.broker.shutdown().await;

    let outcome = outcomes.try_recv().unwrap();
    assert!(outcome.is_success());
    assert!(matches!(
        h.broker.pending().await.unwrap_err(),
        BrokerError::Shutdown
    ));
}
