//! Scripted policy source for testing

use async_trait::async_trait;
use curfew_util::AgentId;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::{FetchError, FetchResult, Policy, PolicySource};

/// Policy source that replays scripted responses.
///
/// Queued responses are consumed first; after that every fetch returns the
/// standing response. Clones share the same script, so a test can keep a
/// handle after moving the source into an agent.
#[derive(Clone)]
pub struct ScriptedSource {
    queue: Arc<Mutex<VecDeque<FetchResult<Policy>>>>,
    standing: Arc<Mutex<FetchResult<Policy>>>,
    delay: Arc<Mutex<Option<Duration>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedSource {
    /// A source that is unreachable until told otherwise
    pub fn new() -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            standing: Arc::new(Mutex::new(Err(FetchError::Unreachable(
                "no response scripted".into(),
            )))),
            delay: Arc::new(Mutex::new(None)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A source that always serves `policy`
    pub fn serving(policy: Policy) -> Self {
        let source = Self::new();
        source.set(Ok(policy));
        source
    }

    /// Replace the standing response
    pub fn set(&self, response: FetchResult<Policy>) {
        *self.standing.lock().unwrap() = response;
    }

    /// Queue a one-shot response
    pub fn push(&self, response: FetchResult<Policy>) {
        self.queue.lock().unwrap().push_back(response);
    }

    /// Delay every fetch (simulates a hanging store)
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Number of fetches served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PolicySource for ScriptedSource {
    async fn fetch_policy(&self, _identity: &AgentId) -> FetchResult<Policy> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(response) = self.queue.lock().unwrap().pop_front() {
            return response;
        }

        self.standing.lock().unwrap().clone()
    }
}
