//! Shared types for the curfew agent

use chrono::{DateTime, Local};
use curfew_util::AgentId;
use serde::{Deserialize, Serialize};

/// Desired state for one workstation, as last read from the policy store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Whether the workstation may be unlocked
    pub unlock_allowed: bool,

    /// YouTube access budget in seconds
    pub youtube_timer_seconds: u32,

    /// When the store record last changed (if the store reported it)
    pub last_updated: Option<DateTime<Local>>,
}

impl Policy {
    pub fn new(unlock_allowed: bool, youtube_timer_seconds: u32) -> Self {
        Self {
            unlock_allowed,
            youtube_timer_seconds,
            last_updated: None,
        }
    }

    pub fn with_last_updated(mut self, last_updated: DateTime<Local>) -> Self {
        self.last_updated = Some(last_updated);
        self
    }

    /// Locking is the complement of the unlock flag
    pub fn lock_required(&self) -> bool {
        !self.unlock_allowed
    }
}

/// Agent-local enforcement state, never persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcementState {
    /// Workstation should be locked
    pub locked: bool,

    /// YouTube domains should be blocked
    pub dns_blocked: bool,

    /// Remaining YouTube budget, rounded up to whole seconds
    pub remaining_budget_seconds: u32,
}

impl EnforcementState {
    /// Locked, blocked, no budget
    pub const FAIL_SAFE: Self = Self {
        locked: true,
        dns_blocked: true,
        remaining_budget_seconds: 0,
    };

    /// True if `self` grants access that `other` withholds
    pub fn is_less_restrictive_than(&self, other: &EnforcementState) -> bool {
        (!self.locked && other.locked) || (!self.dns_blocked && other.dns_blocked)
    }
}

impl Default for EnforcementState {
    fn default() -> Self {
        Self::FAIL_SAFE
    }
}

/// State of the YouTube budget countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetState {
    /// Budget exhausted, zero, or workstation locked
    Idle,
    /// Budget left and workstation unlocked; time is being charged
    Counting,
}

/// Point-in-time view of an agent, for logs and tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub identity: AgentId,
    pub state: EnforcementState,
    pub budget_state: BudgetState,
    pub cached_policy: Option<Policy>,
    pub consecutive_failures: u32,
    pub last_success: Option<DateTime<Local>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_fail_safe() {
        let state = EnforcementState::default();
        assert!(state.locked);
        assert!(state.dns_blocked);
        assert_eq!(state.remaining_budget_seconds, 0);
    }

    #[test]
    fn restrictiveness_ordering() {
        let open = EnforcementState {
            locked: false,
            dns_blocked: false,
            remaining_budget_seconds: 100,
        };
        let blocked = EnforcementState {
            locked: false,
            dns_blocked: true,
            remaining_budget_seconds: 0,
        };

        assert!(open.is_less_restrictive_than(&blocked));
        assert!(blocked.is_less_restrictive_than(&EnforcementState::FAIL_SAFE));
        assert!(!EnforcementState::FAIL_SAFE.is_less_restrictive_than(&open));
        assert!(!blocked.is_less_restrictive_than(&blocked));
    }

    #[test]
    fn policy_lock_required() {
        assert!(Policy::new(false, 600).lock_required());
        assert!(!Policy::new(true, 0).lock_required());
    }
}
