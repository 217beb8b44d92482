//! Probing what this host can enforce

use curfew_host_api::HostCapabilities;
use std::fs::OpenOptions;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info, warn};

/// Running as root
pub fn is_privileged() -> bool {
    nix::unistd::geteuid().is_root()
}

/// Probe the host.
///
/// Nothing is modified: the hosts file is opened for append and closed
/// without writing.
pub fn detect_capabilities(hosts_path: &Path, flush_command: &[String]) -> HostCapabilities {
    let privileged = is_privileged();
    let loginctl = is_loginctl_available();
    let hosts_writable = is_writable(hosts_path);
    let flush = flush_command
        .first()
        .is_some_and(|program| is_on_path(program));

    let caps = HostCapabilities {
        can_lock_session: loginctl,
        can_unlock_session: loginctl && privileged,
        can_query_lock_state: loginctl,
        can_block_dns: hosts_writable,
        can_flush_dns_cache: flush,
        privileged,
    };

    let missing = caps.missing();
    if missing.is_empty() {
        info!("All enforcement capabilities available");
    } else {
        warn!(?missing, "Enforcement capabilities missing");
    }

    caps
}

fn is_loginctl_available() -> bool {
    Command::new("loginctl")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn is_writable(path: &Path) -> bool {
    let writable = OpenOptions::new().append(true).open(path).is_ok();
    debug!(path = %path.display(), writable, "Hosts file probe");
    writable
}

fn is_on_path(program: &str) -> bool {
    if program.contains('/') {
        return Path::new(program).is_file();
    }

    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}
