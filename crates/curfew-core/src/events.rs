//! Core events emitted by the agent

use curfew_api::Policy;
use curfew_host_api::ControlError;
use curfew_util::AgentId;

/// Events emitted by the engine and the reconciler
#[derive(Debug, Clone, PartialEq)]
pub enum CoreEvent {
    /// A fetched policy differs from the cached one
    PolicyChanged {
        previous: Option<Policy>,
        current: Policy,
    },

    /// Remaining budget was reset to a new value
    BudgetReset {
        budget_seconds: u32,
    },

    /// The countdown reached zero
    BudgetExhausted,

    /// Fetch failed transiently; last known policy stays in force
    FetchFailed {
        kind: &'static str,
        message: String,
        consecutive_failures: u32,
    },

    /// The store does not know this agent; locked and blocked
    FailSafeEngaged {
        identity: AgentId,
    },

    LockApplied,
    LockReleased,
    DnsBlocked,
    DnsUnblocked,

    /// A controller could not be driven to its desired state
    EnforcementFailed {
        controller: &'static str,
        desired: bool,
        error: ControlError,
    },
}
