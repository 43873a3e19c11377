//! Applies an approved request to its target components.
//!
//! Every target gets its own command, issued concurrently and bounded by the
//! command timeout. One component failing never stops the others; the
//! outcome is finalized only after every command has a terminal result.
//! Results are gathered as they complete, so the outcome knows which
//! failure came first.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tracing::{debug, warn};

use authlist_core::outcome::REASON_TIMEOUT;
use authlist_core::{AuthorizationRequest, ComponentName, ComponentResult, RequestOutcome};

use crate::commander::{AuthListUpdate, ComponentCommander};

/// Issues authorization-list updates and aggregates the results.
#[derive(Clone)]
pub struct ChangeApplier {
    commander: Arc<dyn ComponentCommander>,
    command_timeout: Duration,
}

impl std::fmt::Debug for ChangeApplier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeApplier")
            .field("command_timeout", &self.command_timeout)
            .finish_non_exhaustive()
    }
}

impl ChangeApplier {
    /// Create an applier over `commander` with a per-command timeout.
    #[must_use]
    pub fn new(commander: Arc<dyn ComponentCommander>, command_timeout: Duration) -> Self {
        Self {
            commander,
            command_timeout,
        }
    }

    /// The per-command timeout.
    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    /// Apply `request`: one command per target component. No command is
    /// retried.
    pub async fn apply(&self, request: AuthorizationRequest) -> RequestOutcome {
        let grant = AuthListUpdate::grant(&request.requester);
        let revoke = AuthListUpdate::revoke(&request.requester);

        let results: Vec<(ComponentName, ComponentResult)> = request
            .authorize
            .iter()
            .map(|name| (name, &grant))
            .chain(request.unauthorize.iter().map(|name| (name, &revoke)))
            .map(|(name, update)| self.issue(name, update))
            .collect::<FuturesUnordered<_>>()
            .collect()
            .await;

        RequestOutcome::applied(request, results)
    }

    async fn issue(
        &self,
        name: &ComponentName,
        update: &AuthListUpdate,
    ) -> (ComponentName, ComponentResult) {
        let sent = tokio::time::timeout(
            self.command_timeout,
            self.commander.send_auth_list_update(name, update),
        )
        .await;

        let result = match sent {
            Ok(Ok(())) => {
                debug!(component = %name, "authorization list updated");
                ComponentResult::Succeeded
            },
            Ok(Err(e)) => {
                warn!(component = %name, error = %e, "authorization list update failed");
                ComponentResult::failed(e.to_string())
            },
            Err(_) => {
                warn!(
                    component = %name,
                    timeout_ms = self.command_timeout.as_millis(),
                    "authorization list update timed out"
                );
                ComponentResult::failed(REASON_TIMEOUT)
            },
        };
        (name.clone(), result)
    }
}
