//! Driving the host controllers toward the desired state

use curfew_api::EnforcementState;
use curfew_host_api::{ControlError, DnsBlockController, Enforcer, LockController};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::CoreEvent;

/// What happened to one controller during a pass
#[derive(Debug, Clone, PartialEq, Eq)]
enum Outcome {
    Unchanged,
    Changed,
    Failed(ControlError),
}

/// Applies desired state to the lock and DNS controllers.
///
/// Controller errors never escape: they become
/// [`CoreEvent::EnforcementFailed`] and the next pass tries again.
pub struct Reconciler {
    lock: Arc<dyn LockController>,
    dns: Arc<dyn DnsBlockController>,
    /// Last state each controller was successfully driven to
    applied_lock: Option<bool>,
    applied_dns: Option<bool>,
}

impl Reconciler {
    pub fn new(lock: Arc<dyn LockController>, dns: Arc<dyn DnsBlockController>) -> Self {
        Self {
            lock,
            dns,
            applied_lock: None,
            applied_dns: None,
        }
    }

    pub async fn reconcile(&mut self, desired: &EnforcementState) -> Vec<CoreEvent> {
        let mut events = Vec::new();

        let outcome = reconcile_one(self.lock.as_ref(), desired.locked, self.applied_lock).await;
        self.record(&outcome, desired.locked, true);
        events.extend(to_event(
            outcome,
            self.lock.name(),
            desired.locked,
            CoreEvent::LockApplied,
            CoreEvent::LockReleased,
        ));

        let outcome = reconcile_one(self.dns.as_ref(), desired.dns_blocked, self.applied_dns).await;
        self.record(&outcome, desired.dns_blocked, false);
        events.extend(to_event(
            outcome,
            self.dns.name(),
            desired.dns_blocked,
            CoreEvent::DnsBlocked,
            CoreEvent::DnsUnblocked,
        ));

        events
    }

    fn record(&mut self, outcome: &Outcome, desired: bool, lock: bool) {
        let slot = if lock {
            &mut self.applied_lock
        } else {
            &mut self.applied_dns
        };
        *slot = match outcome {
            Outcome::Failed(_) => None,
            _ => Some(desired),
        };
    }
}

async fn reconcile_one<C>(controller: &C, desired: bool, applied: Option<bool>) -> Outcome
where
    C: Enforcer + ?Sized,
{
    let observed = match controller.is_enforced().await {
        Ok(observed) => Some(observed),
        Err(e) => {
            warn!(
                controller = controller.name(),
                error = %e,
                "State query failed; applying desired state anyway"
            );
            None
        }
    };

    if observed == Some(desired) {
        debug!(controller = controller.name(), enforced = desired, "Already in desired state");
        return Outcome::Unchanged;
    }

    match controller.apply(desired).await {
        // Without an observation, only report what we have not reported yet
        Ok(()) if observed.is_none() && applied == Some(desired) => Outcome::Unchanged,
        Ok(()) => Outcome::Changed,
        Err(e) => Outcome::Failed(e),
    }
}

fn to_event(
    outcome: Outcome,
    controller: &'static str,
    desired: bool,
    on_enforce: CoreEvent,
    on_release: CoreEvent,
) -> Option<CoreEvent> {
    match outcome {
        Outcome::Unchanged => None,
        Outcome::Changed => {
            info!(controller, enforced = desired, "Enforcement changed");
            Some(if desired { on_enforce } else { on_release })
        }
        Outcome::Failed(error) => {
            warn!(
                controller,
                enforced = desired,
                error = %error,
                "Enforcement failed; will retry next tick"
            );
            Some(CoreEvent::EnforcementFailed {
                controller,
                desired,
                error,
            })
        }
    }
}
