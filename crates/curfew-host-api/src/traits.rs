//! Enforcement controller traits

use async_trait::async_trait;
use thiserror::Error;

/// Errors from enforcement controllers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("System error: {0}")]
    SystemError(String),
}

impl ControlError {
    pub fn system(msg: impl Into<String>) -> Self {
        Self::SystemError(msg.into())
    }

    pub fn permission(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }
}

impl From<std::io::Error> for ControlError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(e.to_string()),
            _ => Self::SystemError(e.to_string()),
        }
    }
}

pub type ControlResult<T> = Result<T, ControlError>;

/// A piece of local state the agent can switch on and off.
///
/// `enforce` and `release` are idempotent: calling either when the state
/// already matches is a successful no-op.
#[async_trait]
pub trait Enforcer: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Observe whether the restriction is currently in place
    async fn is_enforced(&self) -> ControlResult<bool>;

    /// Put the restriction in place
    async fn enforce(&self) -> ControlResult<()>;

    /// Lift the restriction
    async fn release(&self) -> ControlResult<()>;

    /// Drive the restriction to the given state
    async fn apply(&self, enforced: bool) -> ControlResult<()> {
        if enforced {
            self.enforce().await
        } else {
            self.release().await
        }
    }
}

/// Locks the interactive session
pub trait LockController: Enforcer {}

/// Blocks the managed domains through DNS
#[async_trait]
pub trait DnsBlockController: Enforcer {
    /// Remove every trace of blocking, including entries for the managed
    /// domains that this controller did not write itself
    async fn reset(&self) -> ControlResult<()>;
}
