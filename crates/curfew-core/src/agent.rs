//! The agent poll loop

use chrono::{DateTime, Local};
use curfew_api::{AgentSnapshot, FetchError, FetchResult, Policy, PolicySource};
use curfew_host_api::{DnsBlockController, LockController};
use curfew_util::{AgentId, format_duration};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::{AgentEngine, CoreEvent, Reconciler};

/// Loop timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSettings {
    pub poll_interval: Duration,
    /// Upper bound on one fetch; exceeding it counts as unreachable
    pub fetch_timeout: Duration,
}

/// Polls the policy store and enforces the result, one tick at a time
pub struct AgentLoop {
    engine: AgentEngine,
    source: Arc<dyn PolicySource>,
    reconciler: Reconciler,
    settings: LoopSettings,
}

impl AgentLoop {
    pub fn new(
        identity: AgentId,
        source: Arc<dyn PolicySource>,
        lock: Arc<dyn LockController>,
        dns: Arc<dyn DnsBlockController>,
        settings: LoopSettings,
    ) -> Self {
        Self {
            engine: AgentEngine::new(identity),
            source,
            reconciler: Reconciler::new(lock, dns),
            settings,
        }
    }

    pub fn identity(&self) -> &AgentId {
        self.engine.identity()
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        self.engine.snapshot()
    }

    /// One full tick at the current time
    pub async fn tick_once(&mut self) -> Vec<CoreEvent> {
        let result = self.fetch().await;
        self.finish_tick(result, curfew_util::now()).await
    }

    /// One full tick, charging the budget as if it were `now`
    pub async fn tick_at(&mut self, now: DateTime<Local>) -> Vec<CoreEvent> {
        let result = self.fetch().await;
        self.finish_tick(result, now).await
    }

    async fn fetch(&self) -> FetchResult<Policy> {
        let identity = self.engine.identity();
        match tokio::time::timeout(self.settings.fetch_timeout, self.source.fetch_policy(identity))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(FetchError::Unreachable(format!(
                "fetch timed out after {}",
                format_duration(self.settings.fetch_timeout)
            ))),
        }
    }

    async fn finish_tick(
        &mut self,
        result: FetchResult<Policy>,
        now: DateTime<Local>,
    ) -> Vec<CoreEvent> {
        let mut events = self.engine.on_fetch(result, now);
        let desired = self.engine.state();
        events.extend(self.reconciler.reconcile(&desired).await);

        debug!(snapshot = ?self.engine.snapshot(), "Tick complete");
        events
    }

    /// Run until `shutdown` flips to true or its sender goes away.
    ///
    /// An in-flight fetch is abandoned on shutdown. Controllers are left in
    /// whatever state they are in.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> AgentSnapshot {
        info!(
            identity = %self.engine.identity(),
            poll_interval_secs = self.settings.poll_interval.as_secs(),
            fetch_timeout_secs = self.settings.fetch_timeout.as_secs(),
            "Agent loop running"
        );

        let mut ticker = tokio::time::interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !*shutdown.borrow() {
            tokio::select! {
                _ = ticker.tick() => {
                    let result = tokio::select! {
                        result = self.fetch() => result,
                        _ = shutdown.changed() => {
                            info!("Shutdown requested; abandoning policy fetch");
                            break;
                        }
                    };
                    self.finish_tick(result, curfew_util::now()).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        debug!("Shutdown sender dropped");
                        break;
                    }
                }
            }
        }

        let snapshot = self.engine.snapshot();
        info!(
            identity = %snapshot.identity,
            locked = snapshot.state.locked,
            dns_blocked = snapshot.state.dns_blocked,
            "Agent loop stopped"
        );
        snapshot
    }
}
