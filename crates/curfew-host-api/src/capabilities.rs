//! Host capabilities model

use serde::{Deserialize, Serialize};

/// Describes what the host can enforce
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostCapabilities {
    /// Can lock the interactive session
    pub can_lock_session: bool,

    /// Can unlock the session again (otherwise the user has to)
    pub can_unlock_session: bool,

    /// Can observe whether the session is locked
    pub can_query_lock_state: bool,

    /// Can write the DNS block rules
    pub can_block_dns: bool,

    /// Can flush the resolver cache after a change
    pub can_flush_dns_cache: bool,

    /// Running with administrative privileges
    pub privileged: bool,
}

impl HostCapabilities {
    /// Names of the capabilities this host lacks
    pub fn missing(&self) -> Vec<&'static str> {
        [
            (self.can_lock_session, "lock_session"),
            (self.can_unlock_session, "unlock_session"),
            (self.can_query_lock_state, "query_lock_state"),
            (self.can_block_dns, "block_dns"),
            (self.can_flush_dns_cache, "flush_dns_cache"),
            (self.privileged, "privileged"),
        ]
        .into_iter()
        .filter_map(|(present, name)| (!present).then_some(name))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_nothing() {
        let caps = HostCapabilities::default();
        assert!(!caps.can_lock_session);
        assert_eq!(caps.missing().len(), 6);
    }

    #[test]
    fn missing_lists_only_absent() {
        let caps = HostCapabilities {
            can_lock_session: true,
            can_unlock_session: true,
            can_query_lock_state: true,
            can_block_dns: true,
            can_flush_dns_cache: false,
            privileged: true,
        };
        assert_eq!(caps.missing(), vec!["flush_dns_cache"]);
    }
}
