//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Polling and identity settings
    #[serde(default)]
    pub agent: RawAgentSection,

    /// Session lock settings
    #[serde(default)]
    pub lock: RawLockSection,

    /// DNS blocking settings
    #[serde(default)]
    pub dns: RawDnsSection,
}

/// `[agent]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawAgentSection {
    /// Identity in the policy store (default: hostname)
    pub identity: Option<String>,

    /// Base URL of the policy store
    pub store_endpoint: Option<String>,

    /// Seconds between polls
    pub poll_interval_seconds: Option<u64>,

    /// Upper bound on one policy fetch
    pub fetch_timeout_seconds: Option<u64>,
}

/// `[lock]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawLockSection {
    /// loginctl session name ("auto" picks the graphical session)
    pub session: Option<String>,
}

/// `[dns]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawDnsSection {
    /// Hosts file to manage
    pub hosts_path: Option<PathBuf>,

    /// Address blocked domains resolve to
    pub redirect_address: Option<String>,

    /// Domains to block
    pub domains: Option<Vec<String>>,

    /// Command run after the hosts file changes; empty disables flushing
    pub flush_command: Option<Vec<String>>,
}
