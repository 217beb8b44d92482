//! Configuration validation

use crate::schema::{RawAgentSection, RawConfig, RawDnsSection, RawLockSection};
use curfew_util::AgentId;
use std::collections::HashSet;
use std::net::IpAddr;
use thiserror::Error;

/// Longest allowed poll interval
pub const MAX_POLL_INTERVAL_SECONDS: u64 = 3600;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("[agent] {field}: {message}")]
    AgentError { field: &'static str, message: String },

    #[error("[lock] {field}: {message}")]
    LockError { field: &'static str, message: String },

    #[error("[dns] {field}: {message}")]
    DnsError { field: &'static str, message: String },

    #[error("Duplicate domain: {0}")]
    DuplicateDomain(String),

    #[error("fetch_timeout_seconds {timeout}s exceeds poll_interval_seconds {interval}s")]
    TimeoutExceedsInterval { timeout: u64, interval: u64 },
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    errors.extend(validate_agent(&config.agent));
    errors.extend(validate_lock(&config.lock));
    errors.extend(validate_dns(&config.dns));

    errors
}

fn validate_agent(agent: &RawAgentSection) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(identity) = &agent.identity
        && let Err(e) = AgentId::parse(identity.clone())
    {
        errors.push(ValidationError::AgentError {
            field: "identity",
            message: e.to_string(),
        });
    }

    if let Some(endpoint) = &agent.store_endpoint
        && let Err(message) = validate_endpoint(endpoint)
    {
        errors.push(ValidationError::AgentError {
            field: "store_endpoint",
            message,
        });
    }

    if let Some(interval) = agent.poll_interval_seconds
        && !(1..=MAX_POLL_INTERVAL_SECONDS).contains(&interval)
    {
        errors.push(ValidationError::AgentError {
            field: "poll_interval_seconds",
            message: format!("must be between 1 and {}", MAX_POLL_INTERVAL_SECONDS),
        });
    }

    if agent.fetch_timeout_seconds == Some(0) {
        errors.push(ValidationError::AgentError {
            field: "fetch_timeout_seconds",
            message: "must be at least 1".into(),
        });
    }

    let interval = agent
        .poll_interval_seconds
        .unwrap_or(crate::DEFAULT_POLL_INTERVAL_SECONDS);
    let timeout = agent
        .fetch_timeout_seconds
        .unwrap_or(crate::DEFAULT_FETCH_TIMEOUT_SECONDS.min(interval));
    if timeout > interval {
        errors.push(ValidationError::TimeoutExceedsInterval { timeout, interval });
    }

    errors
}

fn validate_lock(lock: &RawLockSection) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(session) = &lock.session
        && (session.is_empty() || session.chars().any(char::is_whitespace))
    {
        errors.push(ValidationError::LockError {
            field: "session",
            message: "must be a non-empty session name without whitespace".into(),
        });
    }

    errors
}

fn validate_dns(dns: &RawDnsSection) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(path) = &dns.hosts_path
        && path.as_os_str().is_empty()
    {
        errors.push(ValidationError::DnsError {
            field: "hosts_path",
            message: "cannot be empty".into(),
        });
    }

    if let Some(address) = &dns.redirect_address
        && address.parse::<IpAddr>().is_err()
    {
        errors.push(ValidationError::DnsError {
            field: "redirect_address",
            message: format!("'{}' is not an IP address", address),
        });
    }

    if let Some(domains) = &dns.domains {
        if domains.is_empty() {
            errors.push(ValidationError::DnsError {
                field: "domains",
                message: "at least one domain is required".into(),
            });
        }

        let mut seen = HashSet::new();
        for domain in domains {
            if let Err(message) = validate_domain(domain) {
                errors.push(ValidationError::DnsError {
                    field: "domains",
                    message,
                });
            } else if !seen.insert(domain.to_ascii_lowercase()) {
                errors.push(ValidationError::DuplicateDomain(domain.clone()));
            }
        }
    }

    if let Some(command) = &dns.flush_command
        && let Some(program) = command.first()
        && program.trim().is_empty()
    {
        errors.push(ValidationError::DnsError {
            field: "flush_command",
            message: "program name cannot be empty".into(),
        });
    }

    errors
}

/// Check a policy store base URL
pub fn validate_endpoint(endpoint: &str) -> Result<(), String> {
    let rest = endpoint
        .strip_prefix("http://")
        .or_else(|| endpoint.strip_prefix("https://"))
        .ok_or_else(|| format!("'{}' must start with http:// or https://", endpoint))?;

    if rest.trim_end_matches('/').is_empty() {
        return Err(format!("'{}' has no host", endpoint));
    }

    if rest.chars().any(char::is_whitespace) {
        return Err(format!("'{}' contains whitespace", endpoint));
    }

    Ok(())
}

/// Check one blocked domain name
pub fn validate_domain(domain: &str) -> Result<(), String> {
    if domain.is_empty() {
        return Err("domain cannot be empty".into());
    }

    if domain.chars().any(|c| c.is_whitespace() || c == '#') {
        return Err(format!("'{}' is not a valid domain", domain));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawConfig {
        RawConfig {
            config_version: 1,
            agent: RawAgentSection::default(),
            lock: RawLockSection::default(),
            dns: RawDnsSection::default(),
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&raw()).is_empty());
    }

    #[test]
    fn rejects_bad_endpoint() {
        assert!(validate_endpoint("http://localhost:8000").is_ok());
        assert!(validate_endpoint("https://store.example/").is_ok());
        assert!(validate_endpoint("localhost:8000").is_err());
        assert!(validate_endpoint("http://").is_err());
    }

    #[test]
    fn rejects_timeout_longer_than_interval() {
        let mut config = raw();
        config.agent.poll_interval_seconds = Some(10);
        config.agent.fetch_timeout_seconds = Some(20);

        let errors = validate_config(&config);
        assert!(matches!(
            errors.as_slice(),
            [ValidationError::TimeoutExceedsInterval { timeout: 20, interval: 10 }]
        ));
    }

    #[test]
    fn short_interval_clamps_default_timeout() {
        let mut config = raw();
        config.agent.poll_interval_seconds = Some(2);
        assert!(validate_config(&config).is_empty());
    }

    #[test]
    fn rejects_zero_interval() {
        let mut config = raw();
        config.agent.poll_interval_seconds = Some(0);
        assert!(!validate_config(&config).is_empty());
    }

    #[test]
    fn rejects_duplicate_and_bad_domains() {
        let mut config = raw();
        config.dns.domains = Some(vec![
            "youtube.com".into(),
            "YouTube.com".into(),
            "bad domain".into(),
        ]);

        let errors = validate_config(&config);
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::DuplicateDomain(d) if d == "YouTube.com")));
    }

    #[test]
    fn rejects_bad_redirect_and_identity() {
        let mut config = raw();
        config.dns.redirect_address = Some("localhost".into());
        config.agent.identity = Some("a/b".into());

        assert_eq!(validate_config(&config).len(), 2);
    }
}
