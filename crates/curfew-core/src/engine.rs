//! Per-tick agent engine
//!
//! Pure state machine: takes the outcome of one policy fetch and the
//! current time, and produces the desired [`EnforcementState`]. It never
//! touches the host; the [`Reconciler`](crate::Reconciler) does that.

use chrono::{DateTime, Local};
use curfew_api::{AgentSnapshot, EnforcementState, FetchResult, Policy};
use curfew_util::AgentId;
use tracing::{debug, info, warn};

use crate::{CoreEvent, TimerBudgetTracker};

/// The agent's decision core
pub struct AgentEngine {
    identity: AgentId,
    state: EnforcementState,
    tracker: TimerBudgetTracker,
    cached_policy: Option<Policy>,
    consecutive_failures: u32,
    last_success: Option<DateTime<Local>>,
}

impl AgentEngine {
    /// Start fail-safe: locked, blocked, no budget
    pub fn new(identity: AgentId) -> Self {
        info!(identity = %identity, "Agent engine initialized");

        Self {
            identity,
            state: EnforcementState::FAIL_SAFE,
            tracker: TimerBudgetTracker::new(),
            cached_policy: None,
            consecutive_failures: 0,
            last_success: None,
        }
    }

    pub fn identity(&self) -> &AgentId {
        &self.identity
    }

    /// Desired state after the last tick
    pub fn state(&self) -> EnforcementState {
        self.state
    }

    pub fn cached_policy(&self) -> Option<&Policy> {
        self.cached_policy.as_ref()
    }

    /// Process the result of one fetch
    pub fn on_fetch(&mut self, result: FetchResult<Policy>, now: DateTime<Local>) -> Vec<CoreEvent> {
        let mut events = Vec::new();

        if self.tracker.advance(now) {
            info!(identity = %self.identity, "YouTube budget exhausted");
            events.push(CoreEvent::BudgetExhausted);
        }

        let (locked, dns_blocked) = match result {
            Ok(policy) => self.on_policy(policy, now, &mut events),

            Err(e) if e.is_transient() => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);

                warn!(
                    identity = %self.identity,
                    kind = e.kind(),
                    error = %e,
                    consecutive_failures = self.consecutive_failures,
                    "Policy fetch failed; keeping last known state"
                );
                events.push(CoreEvent::FetchFailed {
                    kind: e.kind(),
                    message: e.to_string(),
                    consecutive_failures: self.consecutive_failures,
                });

                // Only ever tighten while the store is out of reach
                (
                    self.state.locked,
                    self.state.dns_blocked || self.tracker.should_block(),
                )
            }

            Err(e) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                self.tracker.stop();
                self.cached_policy = None;

                warn!(
                    identity = %self.identity,
                    error = %e,
                    "Agent not registered with the policy store; locking"
                );
                events.push(CoreEvent::FailSafeEngaged {
                    identity: self.identity.clone(),
                });
                (true, true)
            }
        };

        self.state = EnforcementState {
            locked,
            dns_blocked,
            remaining_budget_seconds: self.tracker.remaining_seconds(),
        };

        debug!(
            identity = %self.identity,
            locked,
            dns_blocked,
            remaining_secs = self.state.remaining_budget_seconds,
            budget_state = ?self.tracker.state(),
            "Desired state computed"
        );

        events
    }

    fn on_policy(
        &mut self,
        policy: Policy,
        now: DateTime<Local>,
        events: &mut Vec<CoreEvent>,
    ) -> (bool, bool) {
        self.consecutive_failures = 0;
        self.last_success = Some(now);

        let changed = self.cached_policy.as_ref().is_none_or(|cached| {
            cached.unlock_allowed != policy.unlock_allowed
                || cached.youtube_timer_seconds != policy.youtube_timer_seconds
        });
        if changed {
            info!(
                identity = %self.identity,
                unlock_allowed = policy.unlock_allowed,
                youtube_timer_seconds = policy.youtube_timer_seconds,
                "Policy changed"
            );
            events.push(CoreEvent::PolicyChanged {
                previous: self.cached_policy.clone(),
                current: policy.clone(),
            });
        }

        if self.tracker.apply_policy(&policy) {
            info!(
                identity = %self.identity,
                budget_seconds = policy.youtube_timer_seconds,
                "YouTube budget reset"
            );
            events.push(CoreEvent::BudgetReset {
                budget_seconds: policy.youtube_timer_seconds,
            });
        }

        let locked = policy.lock_required();
        let dns_blocked = locked || self.tracker.should_block();
        self.cached_policy = Some(policy);

        (locked, dns_blocked)
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            identity: self.identity.clone(),
            state: self.state,
            budget_state: self.tracker.state(),
            cached_policy: self.cached_policy.clone(),
            consecutive_failures: self.consecutive_failures,
            last_success: self.last_success,
        }
    }
}
