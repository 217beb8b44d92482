//! YouTube budget countdown

use chrono::{DateTime, Local};
use curfew_api::{BudgetState, Policy};
use curfew_util::{ceil_secs, elapsed_between};
use std::time::Duration;

/// Owns the remaining YouTube budget.
///
/// Time is charged only while [`BudgetState::Counting`]; every call to
/// [`advance`](Self::advance) moves the reference point forward, so time
/// spent idle is never charged later.
#[derive(Debug, Clone)]
pub struct TimerBudgetTracker {
    state: BudgetState,
    remaining: Duration,
    /// Policy value the countdown was last reset to
    baseline: Option<u32>,
    last_tick: Option<DateTime<Local>>,
}

impl TimerBudgetTracker {
    pub fn new() -> Self {
        Self {
            state: BudgetState::Idle,
            remaining: Duration::ZERO,
            baseline: None,
            last_tick: None,
        }
    }

    pub fn state(&self) -> BudgetState {
        self.state
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    /// Remaining budget in whole seconds, rounded up
    pub fn remaining_seconds(&self) -> u32 {
        u32::try_from(ceil_secs(self.remaining)).unwrap_or(u32::MAX)
    }

    /// DNS should be blocked now
    pub fn should_block(&self) -> bool {
        self.remaining.is_zero()
    }

    /// Charge the wall-clock time since the previous call.
    ///
    /// Returns true if this exhausted the budget.
    pub fn advance(&mut self, now: DateTime<Local>) -> bool {
        let elapsed = self
            .last_tick
            .map(|prev| elapsed_between(prev, now))
            .unwrap_or(Duration::ZERO);
        self.last_tick = Some(now);

        if self.state != BudgetState::Counting {
            return false;
        }

        self.remaining = self.remaining.saturating_sub(elapsed);
        if self.remaining.is_zero() {
            self.state = BudgetState::Idle;
            return true;
        }
        false
    }

    /// Apply a freshly fetched policy.
    ///
    /// Returns true if the remaining budget was reset.
    pub fn apply_policy(&mut self, policy: &Policy) -> bool {
        let reset = self.baseline != Some(policy.youtube_timer_seconds);
        if reset {
            self.remaining = Duration::from_secs(u64::from(policy.youtube_timer_seconds));
            self.baseline = Some(policy.youtube_timer_seconds);
        }

        self.state = if policy.unlock_allowed && !self.remaining.is_zero() {
            BudgetState::Counting
        } else {
            BudgetState::Idle
        };

        reset
    }

    /// Stop counting and forget the baseline, so the next policy resets
    pub fn stop(&mut self) {
        self.state = BudgetState::Idle;
        self.remaining = Duration::ZERO;
        self.baseline = None;
    }
}

impl Default for TimerBudgetTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn at(secs: i64) -> DateTime<Local> {
        t0() + chrono::Duration::seconds(secs)
    }

    #[test]
    fn starts_idle_and_blocking() {
        let tracker = TimerBudgetTracker::new();
        assert_eq!(tracker.state(), BudgetState::Idle);
        assert!(tracker.should_block());
        assert_eq!(tracker.remaining_seconds(), 0);
    }

    #[test]
    fn counts_down_and_exhausts() {
        let mut tracker = TimerBudgetTracker::new();
        tracker.advance(at(0));
        assert!(tracker.apply_policy(&Policy::new(true, 300)));
        assert_eq!(tracker.state(), BudgetState::Counting);

        assert!(!tracker.advance(at(100)));
        assert_eq!(tracker.remaining_seconds(), 200);

        assert!(tracker.advance(at(301)));
        assert_eq!(tracker.state(), BudgetState::Idle);
        assert!(tracker.should_block());

        // Same value again does not refill
        assert!(!tracker.apply_policy(&Policy::new(true, 300)));
        assert!(tracker.should_block());
    }

    #[test]
    fn new_value_resets_budget() {
        let mut tracker = TimerBudgetTracker::new();
        tracker.advance(at(0));
        tracker.apply_policy(&Policy::new(true, 10));
        tracker.advance(at(8));
        assert_eq!(tracker.remaining_seconds(), 2);

        assert!(tracker.apply_policy(&Policy::new(true, 600)));
        assert_eq!(tracker.remaining_seconds(), 600);
        assert_eq!(tracker.state(), BudgetState::Counting);
    }

    #[test]
    fn locked_policy_pauses_countdown() {
        let mut tracker = TimerBudgetTracker::new();
        tracker.advance(at(0));
        tracker.apply_policy(&Policy::new(true, 300));
        tracker.advance(at(100));

        tracker.apply_policy(&Policy::new(false, 300));
        assert_eq!(tracker.state(), BudgetState::Idle);

        tracker.advance(at(1000));
        assert_eq!(tracker.remaining_seconds(), 200);
        assert!(!tracker.should_block());

        // Unlocking resumes from where it stopped
        tracker.apply_policy(&Policy::new(true, 300));
        assert_eq!(tracker.state(), BudgetState::Counting);
        assert_eq!(tracker.remaining_seconds(), 200);
    }

    #[test]
    fn backward_clock_charges_nothing() {
        let mut tracker = TimerBudgetTracker::new();
        tracker.advance(at(0));
        tracker.apply_policy(&Policy::new(true, 300));

        tracker.advance(at(-3600));
        assert_eq!(tracker.remaining_seconds(), 300);
    }

    #[test]
    fn remaining_is_rounded_up() {
        let mut tracker = TimerBudgetTracker::new();
        let start = t0();
        tracker.advance(start);
        tracker.apply_policy(&Policy::new(true, 10));

        tracker.advance(start + chrono::Duration::milliseconds(9_500));
        assert_eq!(tracker.remaining_seconds(), 1);
        assert!(!tracker.should_block());
    }

    #[test]
    fn zero_budget_never_counts() {
        let mut tracker = TimerBudgetTracker::new();
        tracker.advance(at(0));
        assert!(tracker.apply_policy(&Policy::new(true, 0)));
        assert_eq!(tracker.state(), BudgetState::Idle);
        assert!(tracker.should_block());
    }

    #[test]
    fn stop_forces_reset_on_next_policy() {
        let mut tracker = TimerBudgetTracker::new();
        tracker.advance(at(0));
        tracker.apply_policy(&Policy::new(true, 300));
        tracker.stop();
        assert!(tracker.should_block());

        assert!(tracker.apply_policy(&Policy::new(true, 300)));
        assert_eq!(tracker.remaining_seconds(), 300);
    }

    #[test]
    fn monotonic_while_counting() {
        let mut tracker = TimerBudgetTracker::new();
        tracker.advance(at(0));
        tracker.apply_policy(&Policy::new(true, 120));

        let mut previous = tracker.remaining();
        for secs in [5, 5, 30, 29, 60, 200] {
            tracker.advance(at(secs));
            assert!(tracker.remaining() <= previous);
            previous = tracker.remaining();
        }
        assert!(tracker.remaining().is_zero());
    }
}
