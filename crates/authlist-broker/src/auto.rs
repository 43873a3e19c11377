//! Auto-approval: every validated request is approved and applied at once.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{info, warn};

use authlist_core::{AuthorizationRequest, BrokerError, BrokerResult, RequestKey, RequestOutcome};

use crate::applier::ChangeApplier;

type InFlight = Arc<Mutex<HashSet<RequestKey>>>;

fn lock(in_flight: &InFlight) -> MutexGuard<'_, HashSet<RequestKey>> {
    in_flight.lock().unwrap_or_else(|e| {
        warn!("in-flight set lock poisoned, recovering");
        e.into_inner()
    })
}

/// Releases a request key when the application finishes or is dropped.
struct InFlightGuard {
    in_flight: InFlight,
    key: RequestKey,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock(&self.in_flight).remove(&self.key);
    }
}

/// Approves everything and hands it straight to the [`ChangeApplier`].
///
/// Two identical requests never apply concurrently: the second one gets
/// [`BrokerError::DuplicateRequest`] while the first is still running.
#[derive(Debug)]
pub struct AutoApprover {
    applier: ChangeApplier,
    in_flight: InFlight,
}

impl AutoApprover {
    /// Create an auto-approver over `applier`.
    #[must_use]
    pub fn new(applier: ChangeApplier) -> Self {
        Self {
            applier,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Approve and apply `request`.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::DuplicateRequest`] if an identical request is
    /// still being applied.
    pub async fn decide(&self, request: AuthorizationRequest) -> BrokerResult<RequestOutcome> {
        let _guard = self.reserve(request.key())?;
        info!(request_id = %request.id, "auto-approved");
        Ok(self.applier.apply(request).await)
    }

    /// Number of requests currently being applied.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        lock(&self.in_flight).len()
    }

    fn reserve(&self, key: RequestKey) -> BrokerResult<InFlightGuard> {
        if !lock(&self.in_flight).insert(key.clone()) {
            return Err(BrokerError::DuplicateRequest { key });
        }
        Ok(InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
            key,
        })
    }
}
