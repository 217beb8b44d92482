//! Validated agent configuration

use crate::schema::{RawAgentSection, RawConfig, RawDnsSection, RawLockSection};
use curfew_util::AgentId;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

/// Policy store the original deployment listens on
pub const DEFAULT_STORE_ENDPOINT: &str = "http://localhost:8000";

pub const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 15;

pub const DEFAULT_FETCH_TIMEOUT_SECONDS: u64 = 5;

/// loginctl's name for "the graphical session of the caller, or the display session"
pub const DEFAULT_LOCK_SESSION: &str = "auto";

/// Validated configuration ready for use by the agent
#[derive(Debug, Clone, Default)]
pub struct AgentConfig {
    pub agent: AgentSettings,
    pub lock: LockSettings,
    pub dns: DnsSettings,
}

impl AgentConfig {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            agent: AgentSettings::from_raw(raw.agent),
            lock: LockSettings::from_raw(raw.lock),
            dns: DnsSettings::from_raw(raw.dns),
        }
    }
}

/// Polling settings
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Configured identity; the hostname is used when absent
    pub identity: Option<AgentId>,
    pub store_endpoint: String,
    pub poll_interval: Duration,
    pub fetch_timeout: Duration,
}

impl AgentSettings {
    fn from_raw(raw: RawAgentSection) -> Self {
        let interval = raw
            .poll_interval_seconds
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECONDS);
        let timeout = raw
            .fetch_timeout_seconds
            .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECONDS.min(interval));

        Self {
            identity: raw.identity.and_then(|id| AgentId::parse(id).ok()),
            store_endpoint: raw
                .store_endpoint
                .unwrap_or_else(|| DEFAULT_STORE_ENDPOINT.to_string()),
            poll_interval: Duration::from_secs(interval),
            fetch_timeout: Duration::from_secs(timeout),
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::from_raw(RawAgentSection::default())
    }
}

/// Session lock settings
#[derive(Debug, Clone)]
pub struct LockSettings {
    pub session: String,
}

impl LockSettings {
    fn from_raw(raw: RawLockSection) -> Self {
        Self {
            session: raw
                .session
                .unwrap_or_else(|| DEFAULT_LOCK_SESSION.to_string()),
        }
    }
}

impl Default for LockSettings {
    fn default() -> Self {
        Self::from_raw(RawLockSection::default())
    }
}

/// DNS blocking settings
#[derive(Debug, Clone)]
pub struct DnsSettings {
    pub hosts_path: PathBuf,
    pub redirect_address: IpAddr,
    pub domains: Vec<String>,
    /// Empty means "do not flush"
    pub flush_command: Vec<String>,
}

impl DnsSettings {
    fn from_raw(raw: RawDnsSection) -> Self {
        Self {
            hosts_path: raw.hosts_path.unwrap_or_else(default_hosts_path),
            redirect_address: raw
                .redirect_address
                .and_then(|a| a.parse().ok())
                .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            domains: raw.domains.unwrap_or_else(default_blocked_domains),
            flush_command: raw.flush_command.unwrap_or_else(default_flush_command),
        }
    }
}

impl Default for DnsSettings {
    fn default() -> Self {
        Self::from_raw(RawDnsSection::default())
    }
}

fn default_hosts_path() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from(r"C:\Windows\System32\drivers\etc\hosts")
    } else {
        PathBuf::from("/etc/hosts")
    }
}

/// YouTube domains blocked when the budget runs out
pub fn default_blocked_domains() -> Vec<String> {
    ["youtube.com", "www.youtube.com", "m.youtube.com", "youtu.be"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_flush_command() -> Vec<String> {
    let argv: &[&str] = if cfg!(windows) {
        &["ipconfig", "/flushdns"]
    } else {
        &["resolvectl", "flush-caches"]
    };
    argv.iter().map(|s| s.to_string()).collect()
}
