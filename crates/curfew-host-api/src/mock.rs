//! Mock controllers for testing

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::{ControlError, ControlResult, DnsBlockController, Enforcer, LockController};

/// In-memory controller usable as either a lock or a DNS block.
///
/// Clones share state, so a test can keep a handle after giving one to
/// the agent.
#[derive(Clone)]
pub struct MockController {
    name: &'static str,
    enforced: Arc<Mutex<bool>>,

    /// Configure enforce to fail
    pub fail_enforce: Arc<Mutex<bool>>,

    /// Configure release to fail
    pub fail_release: Arc<Mutex<bool>>,

    /// Configure is_enforced to fail
    pub fail_query: Arc<Mutex<bool>>,

    enforce_calls: Arc<AtomicUsize>,
    release_calls: Arc<AtomicUsize>,
    reset_calls: Arc<AtomicUsize>,
    /// Calls that actually flipped the state
    changes: Arc<AtomicUsize>,
}

impl MockController {
    pub fn new(name: &'static str, enforced: bool) -> Self {
        Self {
            name,
            enforced: Arc::new(Mutex::new(enforced)),
            fail_enforce: Arc::new(Mutex::new(false)),
            fail_release: Arc::new(Mutex::new(false)),
            fail_query: Arc::new(Mutex::new(false)),
            enforce_calls: Arc::new(AtomicUsize::new(0)),
            release_calls: Arc::new(AtomicUsize::new(0)),
            reset_calls: Arc::new(AtomicUsize::new(0)),
            changes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// An unlocked session
    pub fn lock() -> Self {
        Self::new("session_lock", false)
    }

    /// An unblocked resolver
    pub fn dns() -> Self {
        Self::new("dns_block", false)
    }

    /// Current state, bypassing failure injection
    pub fn enforced(&self) -> bool {
        *self.enforced.lock().unwrap()
    }

    /// Flip the state behind the agent's back (e.g. the user unlocked)
    pub fn set_enforced(&self, enforced: bool) {
        *self.enforced.lock().unwrap() = enforced;
    }

    pub fn set_fail_enforce(&self, fail: bool) {
        *self.fail_enforce.lock().unwrap() = fail;
    }

    pub fn set_fail_release(&self, fail: bool) {
        *self.fail_release.lock().unwrap() = fail;
    }

    pub fn set_fail_query(&self, fail: bool) {
        *self.fail_query.lock().unwrap() = fail;
    }

    pub fn enforce_calls(&self) -> usize {
        self.enforce_calls.load(Ordering::SeqCst)
    }

    pub fn release_calls(&self) -> usize {
        self.release_calls.load(Ordering::SeqCst)
    }

    pub fn reset_calls(&self) -> usize {
        self.reset_calls.load(Ordering::SeqCst)
    }

    pub fn changes(&self) -> usize {
        self.changes.load(Ordering::SeqCst)
    }

    fn set(&self, target: bool) {
        let mut enforced = self.enforced.lock().unwrap();
        if *enforced != target {
            *enforced = target;
            self.changes.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl Enforcer for MockController {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn is_enforced(&self) -> ControlResult<bool> {
        if *self.fail_query.lock().unwrap() {
            return Err(ControlError::system("Mock query failure"));
        }
        Ok(self.enforced())
    }

    async fn enforce(&self) -> ControlResult<()> {
        self.enforce_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_enforce.lock().unwrap() {
            return Err(ControlError::permission("Mock enforce failure"));
        }
        self.set(true);
        Ok(())
    }

    async fn release(&self) -> ControlResult<()> {
        self.release_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_release.lock().unwrap() {
            return Err(ControlError::system("Mock release failure"));
        }
        self.set(false);
        Ok(())
    }
}

impl LockController for MockController {}

#[async_trait]
impl DnsBlockController for MockController {
    async fn reset(&self) -> ControlResult<()> {
        self.reset_calls.fetch_add(1, Ordering::SeqCst);
        self.set(false);
        Ok(())
    }
}
