//! Strongly-typed identifiers for curfew

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{CurfewError, Result};

/// Name of one workstation in the policy store.
///
/// The identity is embedded as a single path segment in policy store URLs,
/// so it must be non-empty and free of separators and whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AgentId(String);

impl AgentId {
    /// Validate and wrap an identity string
    pub fn parse(id: impl Into<String>) -> Result<Self> {
        let id = id.into();

        if id.is_empty() {
            return Err(CurfewError::invalid_identity(id, "identity cannot be empty"));
        }

        if let Some(c) = id
            .chars()
            .find(|c| c.is_whitespace() || c.is_control() || matches!(c, '/' | '?' | '#' | '%'))
        {
            return Err(CurfewError::invalid_identity(
                id.clone(),
                format!("identity cannot contain {c:?}"),
            ));
        }

        Ok(Self(id))
    }

    /// Identity derived from the local hostname
    pub fn from_hostname() -> Result<Self> {
        let hostname = nix::unistd::gethostname()
            .map_err(|e| CurfewError::HostnameUnavailable(e.to_string()))?;
        let hostname = hostname
            .into_string()
            .map_err(|_| CurfewError::HostnameUnavailable("hostname is not valid UTF-8".into()))?;

        Self::parse(hostname)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AgentId {
    type Err = CurfewError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AgentId {
    type Error = CurfewError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<AgentId> for String {
    fn from(id: AgentId) -> Self {
        id.0
    }
}
