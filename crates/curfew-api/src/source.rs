//! The policy source seam between the agent loop and the policy store

use async_trait::async_trait;
use curfew_util::AgentId;
use thiserror::Error;

use crate::Policy;

/// Why a policy fetch did not produce a policy
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Connection failure, timeout, or server-side error
    #[error("Policy store unreachable: {0}")]
    Unreachable(String),

    /// The store answered but the response could not be understood
    #[error("Malformed policy response: {0}")]
    Malformed(String),

    /// The store has no record for this identity
    #[error("No policy registered for '{0}'")]
    NotFound(AgentId),
}

impl FetchError {
    /// Transient failures keep the last known policy in force
    pub fn is_transient(&self) -> bool {
        !matches!(self, FetchError::NotFound(_))
    }

    /// Short stable label for structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Unreachable(_) => "unreachable",
            FetchError::Malformed(_) => "malformed",
            FetchError::NotFound(_) => "not_found",
        }
    }
}

pub type FetchResult<T> = Result<T, FetchError>;

/// Something the agent can read its policy from.
///
/// One call is one attempt: implementations must not retry internally.
#[async_trait]
pub trait PolicySource: Send + Sync {
    async fn fetch_policy(&self, identity: &AgentId) -> FetchResult<Policy>;
}
