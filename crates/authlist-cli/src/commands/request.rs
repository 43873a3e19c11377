//! `authlist request`.

use std::time::Duration;

use anyhow::{Result, bail};
use colored::Colorize;

use authlist_core::RawAuthorizationRequest;
use authlist_daemon::SubmissionInfo;

use crate::daemon_client::DaemonClient;
use crate::formatter::{OutputFormat, print_json, print_outcome};
use crate::theme::Theme;

/// Stand-in for the caller's own identity.
const ME: &str = "me";

/// Expand `me` to `user@host`; any other requester is returned as given.
pub(crate) fn expand_requester(
    requester: &str,
    user: Option<String>,
    host: Option<String>,
) -> Result<String> {
    if requester != ME {
        return Ok(requester.to_string());
    }
    let Some(user) = user.filter(|u| !u.is_empty()) else {
        bail!("cannot expand '{ME}': USER is not set");
    };
    Ok(match host.filter(|h| !h.is_empty()) {
        Some(host) => format!("{user}@{host}"),
        None => user,
    })
}

fn current_user() -> Option<String> {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
}

fn current_host() -> Option<String> {
    std::env::var("HOSTNAME").ok().or_else(|| {
        std::fs::read_to_string("/etc/hostname")
            .ok()
            .map(|h| h.trim().to_string())
    })
}

/// Submit one request and print what happened.
///
/// With `wait`, a deferred request is followed until its outcome arrives
/// or `wait` elapses.
pub(crate) async fn run_request(
    client: &DaemonClient,
    requester: &str,
    authorize: Vec<String>,
    unauthorize: Vec<String>,
    wait: Option<Duration>,
    format: OutputFormat,
) -> Result<()> {
    let requester = expand_requester(requester, current_user(), current_host())?;
    let raw = RawAuthorizationRequest {
        requester,
        authorize,
        unauthorize,
    };

    // Subscribe first so an approval that lands right after submission is
    // not missed.
    let mut outcomes = match wait {
        Some(_) => Some(client.subscribe_outcomes().await?),
        None => None,
    };

    let info = client.request_authorization(raw).await?;
    let (request_id, token) = match info {
        SubmissionInfo::Decided { outcome } => return print_outcome(&outcome, format),
        SubmissionInfo::Deferred { request_id, token } => (request_id, token),
    };

    match format {
        OutputFormat::Json => print_json(&SubmissionInfo::Deferred {
            request_id,
            token: token.clone(),
        })?,
        OutputFormat::Pretty => println!(
            "{}",
            Theme::info(&format!(
                "Request {request_id} submitted for approval (token {})",
                token.as_str().cyan()
            ))
        ),
    }

    let (Some(limit), Some(outcomes)) = (wait, outcomes.as_mut()) else {
        return Ok(());
    };
    let wait_for_outcome = async {
        while let Some(next) = outcomes.next().await {
            let outcome = next?;
            if outcome.request_id() == request_id {
                return print_outcome(&outcome, format);
            }
        }
        bail!("daemon closed the outcome stream")
    };
    match tokio::time::timeout(limit, wait_for_outcome).await {
        Ok(result) => result,
        Err(_) => {
            println!(
                "{}",
                Theme::warning("Still pending; check `authlist pending` later")
            );
            Ok(())
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn me_expands_to_user_at_host() {
        let expanded =
            expand_requester("me", Some("userA".into()), Some("tel-01".into())).unwrap();
        assert_eq!(expanded, "userA@tel-01");
    }

    #[test]
    fn me_without_host_is_the_bare_user() {
        assert_eq!(
            expand_requester("me", Some("userA".into()), None).unwrap(),
            "userA"
        );
        assert!(expand_requester("me", None, Some("tel-01".into())).is_err());
    }

    #[test]
    fn other_requesters_pass_through() {
        assert_eq!(
            expand_requester("userB@host", None, None).unwrap(),
            "userB@host"
        );
    }
}
