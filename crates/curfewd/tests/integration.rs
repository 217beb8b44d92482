//! Integration tests for curfewd
//!
//! These tests drive the agent loop end to end against scripted policy
//! sources, mock controllers, a mock HTTP store and a scratch hosts file.

use chrono::{DateTime, Local, TimeZone};
use curfew_api::{BudgetState, EnforcementState, FetchError, Policy, ScriptedSource};
use curfew_client::PolicyClient;
use curfew_core::{AgentLoop, CoreEvent, LoopSettings};
use curfew_host_api::{Enforcer, MockController};
use curfew_host_linux::{BLOCK_BEGIN, HostsFileBlock};
use curfew_util::AgentId;
use serde_json::json;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    agent: AgentLoop,
    source: ScriptedSource,
    lock: MockController,
    dns: MockController,
}

fn kids_pc() -> AgentId {
    AgentId::parse("kids-pc").unwrap()
}

fn settings() -> LoopSettings {
    LoopSettings {
        poll_interval: Duration::from_millis(20),
        fetch_timeout: Duration::from_millis(200),
    }
}

fn harness() -> Harness {
    let source = ScriptedSource::new();
    let lock = MockController::lock();
    let dns = MockController::dns();
    let agent = AgentLoop::new(
        kids_pc(),
        Arc::new(source.clone()),
        Arc::new(lock.clone()),
        Arc::new(dns.clone()),
        settings(),
    );
    Harness {
        agent,
        source,
        lock,
        dns,
    }
}

fn at(secs: i64) -> DateTime<Local> {
    Local.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap() + chrono::Duration::seconds(secs)
}

#[tokio::test]
async fn test_startup_outage_stays_fail_safe() {
    let mut h = harness();

    h.agent.tick_at(at(0)).await;

    assert_eq!(h.agent.snapshot().state, EnforcementState::FAIL_SAFE);
    assert!(h.lock.enforced());
    assert!(h.dns.enforced());
}

#[tokio::test]
async fn test_locked_policy_locks_within_one_tick() {
    let mut h = harness();
    h.source.set(Ok(Policy::new(true, 600)));
    h.agent.tick_at(at(0)).await;
    assert!(!h.lock.enforced());

    h.source.set(Ok(Policy::new(false, 600)));
    let events = h.agent.tick_at(at(15)).await;

    assert!(events.contains(&CoreEvent::LockApplied));
    assert!(h.lock.enforced());
    // Scenario D: a locked workstation is also DNS blocked
    assert!(h.dns.enforced());
}

#[tokio::test]
async fn test_budget_exhaustion_blocks_dns_only() {
    let mut h = harness();
    h.source.set(Ok(Policy::new(true, 300)));

    h.agent.tick_at(at(0)).await;
    assert!(!h.lock.enforced());
    assert!(!h.dns.enforced());

    let events = h.agent.tick_at(at(301)).await;
    assert!(events.contains(&CoreEvent::BudgetExhausted));
    assert!(events.contains(&CoreEvent::DnsBlocked));
    assert!(!h.lock.enforced());
    assert!(h.dns.enforced());
    assert_eq!(h.agent.snapshot().budget_state, BudgetState::Idle);
}

#[tokio::test]
async fn test_raised_budget_unblocks() {
    let mut h = harness();
    h.source.set(Ok(Policy::new(true, 10)));
    h.agent.tick_at(at(0)).await;
    h.agent.tick_at(at(8)).await;
    assert_eq!(h.agent.snapshot().state.remaining_budget_seconds, 2);

    h.source.set(Ok(Policy::new(true, 600)));
    h.agent.tick_at(at(8)).await;

    let snapshot = h.agent.snapshot();
    assert_eq!(snapshot.state.remaining_budget_seconds, 600);
    assert!(!snapshot.state.dns_blocked);
    assert!(!h.dns.enforced());
}

#[tokio::test]
async fn test_not_found_locks_regardless_of_prior_state() {
    let mut h = harness();
    h.source.set(Ok(Policy::new(true, 600)));
    h.agent.tick_at(at(0)).await;
    assert!(!h.lock.enforced());

    h.source.set(Err(FetchError::NotFound(kids_pc())));
    let events = h.agent.tick_at(at(15)).await;

    assert!(events.contains(&CoreEvent::FailSafeEngaged {
        identity: kids_pc()
    }));
    assert!(h.lock.enforced());
    assert!(h.dns.enforced());
    assert!(h.agent.snapshot().cached_policy.is_none());
}

#[tokio::test]
async fn test_outage_never_loosens() {
    let mut h = harness();
    h.source.set(Ok(Policy::new(true, 45)));
    h.agent.tick_at(at(0)).await;

    h.source.set(Err(FetchError::Unreachable("connection refused".into())));
    let mut previous = h.agent.snapshot().state;
    for i in 1..=6 {
        h.agent.tick_at(at(i * 15)).await;
        let current = h.agent.snapshot().state;
        assert!(!current.is_less_restrictive_than(&previous));
        previous = current;
    }

    assert!(!h.lock.enforced());
    assert!(h.dns.enforced());
    assert_eq!(h.agent.snapshot().consecutive_failures, 6);
}

#[tokio::test]
async fn test_recovery_after_outage() {
    let mut h = harness();
    h.source.push(Err(FetchError::Unreachable("timeout".into())));
    h.source.push(Err(FetchError::Malformed("bad json".into())));
    h.source.set(Ok(Policy::new(true, 600)));

    h.agent.tick_at(at(0)).await;
    h.agent.tick_at(at(15)).await;
    assert_eq!(h.agent.snapshot().consecutive_failures, 2);
    assert!(h.lock.enforced());

    h.agent.tick_at(at(30)).await;
    let snapshot = h.agent.snapshot();
    assert_eq!(snapshot.consecutive_failures, 0);
    assert!(!h.lock.enforced());
    assert!(!h.dns.enforced());
}

#[tokio::test]
async fn test_steady_state_is_idempotent() {
    let mut h = harness();
    h.source.set(Ok(Policy::new(false, 0)));

    for i in 0..5 {
        h.agent.tick_at(at(i * 15)).await;
    }

    assert_eq!(h.lock.changes(), 1);
    assert_eq!(h.dns.changes(), 1);
    assert_eq!(h.lock.enforce_calls(), 1);
    assert_eq!(h.dns.enforce_calls(), 1);
}

#[tokio::test]
async fn test_controller_failure_does_not_stop_the_loop() {
    let mut h = harness();
    h.source.set(Ok(Policy::new(false, 0)));
    h.lock.set_fail_enforce(true);

    let events = h.agent.tick_at(at(0)).await;
    assert!(events.iter().any(|e| matches!(
        e,
        CoreEvent::EnforcementFailed {
            controller: "session_lock",
            ..
        }
    )));
    assert!(h.dns.enforced());

    h.lock.set_fail_enforce(false);
    h.agent.tick_at(at(15)).await;
    assert!(h.lock.enforced());
}

#[tokio::test]
async fn test_run_until_shutdown_keeps_enforcement() {
    let h = harness();
    h.source.set(Ok(Policy::new(false, 600)));
    let (tx, rx) = watch::channel(false);

    let handle = tokio::spawn(h.agent.run(rx));
    tokio::time::sleep(Duration::from_millis(100)).await;
    tx.send(true).unwrap();
    let snapshot = handle.await.unwrap();

    assert!(h.source.calls() >= 2);
    assert!(snapshot.state.locked);
    // No release on shutdown
    assert!(h.lock.enforced());
    assert!(h.dns.enforced());
    assert_eq!(h.lock.release_calls(), 0);
}

async fn mount_store(server: &MockServer, unlock: bool, timer: i64) {
    Mock::given(method("GET"))
        .and(path("/client/kids-pc/unlock-status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "client_name": "kids-pc",
            "unlock": unlock,
            "last_updated": "2025-06-01T12:00:00"
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/client/kids-pc/youtube-timer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "client_name": "kids-pc",
            "timer_seconds": timer,
            "last_updated": "2025-06-01T12:00:00"
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_http_store_to_hosts_file() {
    let server = MockServer::start().await;
    mount_store(&server, true, 0).await;

    let dir = tempfile::tempdir().unwrap();
    let hosts_path = dir.path().join("hosts");
    std::fs::write(&hosts_path, "127.0.0.1 localhost\n").unwrap();

    let hosts = HostsFileBlock::new(
        &hosts_path,
        IpAddr::V4(Ipv4Addr::LOCALHOST),
        vec!["youtube.com".into(), "youtu.be".into()],
        Vec::new(),
    );
    let lock = MockController::lock();
    let mut agent = AgentLoop::new(
        kids_pc(),
        Arc::new(PolicyClient::new(&server.uri(), Duration::from_secs(2))),
        Arc::new(lock.clone()),
        Arc::new(hosts),
        settings(),
    );

    // Unlocked with no budget: DNS blocked straight away
    let events = agent.tick_once().await;
    assert!(events.contains(&CoreEvent::DnsBlocked));
    assert!(!lock.enforced());

    let contents = std::fs::read_to_string(&hosts_path).unwrap();
    assert!(contents.starts_with("127.0.0.1 localhost\n"));
    assert!(contents.contains(BLOCK_BEGIN));
    assert!(contents.contains("127.0.0.1 youtu.be"));

    // Store grants a budget: block comes off again
    server.reset().await;
    mount_store(&server, true, 600).await;
    let events = agent.tick_once().await;
    assert!(events.contains(&CoreEvent::DnsUnblocked));
    assert_eq!(
        std::fs::read_to_string(&hosts_path).unwrap(),
        "127.0.0.1 localhost\n"
    );
}

#[tokio::test]
async fn test_unregistered_agent_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Client not found"})))
        .mount(&server)
        .await;

    let lock = MockController::lock();
    let dns = MockController::dns();
    let mut agent = AgentLoop::new(
        kids_pc(),
        Arc::new(PolicyClient::new(&server.uri(), Duration::from_secs(2))),
        Arc::new(lock.clone()),
        Arc::new(dns.clone()),
        settings(),
    );

    let events = agent.tick_once().await;
    assert!(matches!(events.first(), Some(CoreEvent::FailSafeEngaged { .. })));
    assert!(lock.is_enforced().await.unwrap());
    assert!(dns.is_enforced().await.unwrap());
}
