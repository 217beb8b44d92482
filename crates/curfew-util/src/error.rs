//! Error types for curfew

use thiserror::Error;

/// Shared error type for curfew utilities
#[derive(Debug, Error)]
pub enum CurfewError {
    #[error("Invalid agent identity '{value}': {reason}")]
    InvalidIdentity { value: String, reason: String },

    #[error("Hostname unavailable: {0}")]
    HostnameUnavailable(String),
}

impl CurfewError {
    pub fn invalid_identity(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidIdentity {
            value: value.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CurfewError>;
