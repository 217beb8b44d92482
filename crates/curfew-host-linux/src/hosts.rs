//! DNS blocking through the hosts file
//!
//! The blocker owns one marked block in the hosts file and never touches
//! lines outside it, except in [`DnsBlockController::reset`].

use async_trait::async_trait;
use curfew_host_api::{ControlError, ControlResult, DnsBlockController, Enforcer};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::command::run;

pub const BLOCK_BEGIN: &str = "# BEGIN curfew";
pub const BLOCK_END: &str = "# END curfew";

/// Blocks domains by redirecting them in a hosts file
pub struct HostsFileBlock {
    path: PathBuf,
    redirect_address: IpAddr,
    domains: Vec<String>,
    flush_command: Vec<String>,
}

impl HostsFileBlock {
    pub fn new(
        path: impl Into<PathBuf>,
        redirect_address: IpAddr,
        domains: Vec<String>,
        flush_command: Vec<String>,
    ) -> Self {
        Self {
            path: path.into(),
            redirect_address,
            domains,
            flush_command,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lines that make up the managed block body
    pub fn expected_entries(&self) -> Vec<String> {
        self.domains
            .iter()
            .map(|domain| format!("{} {}", self.redirect_address, domain))
            .collect()
    }

    async fn read(&self) -> ControlResult<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the file through a sibling temp file and a rename
    async fn write(&self, contents: &str) -> ControlResult<()> {
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| ControlError::system(format!("{} is not a file", self.path.display())))?
            .to_string_lossy();
        let tmp = self.path.with_file_name(format!(".{}.curfew.tmp", file_name));

        tokio::fs::write(&tmp, contents).await?;

        if let Ok(meta) = tokio::fs::metadata(&self.path).await
            && let Err(e) = tokio::fs::set_permissions(&tmp, meta.permissions()).await
        {
            warn!(path = %tmp.display(), error = %e, "Failed to copy hosts file permissions");
        }

        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!(path = %self.path.display(), "Hosts file rewritten");
        Ok(())
    }

    /// Flush the resolver cache; failures only warn
    async fn flush(&self) {
        let Some((program, args)) = self.flush_command.split_first() else {
            return;
        };
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        match run(program, &args).await {
            Ok(_) => debug!(program = %program, "DNS cache flushed"),
            Err(e) => warn!(program = %program, error = %e, "DNS cache flush failed"),
        }
    }

    async fn replace(&self, contents: &str) -> ControlResult<()> {
        self.write(contents).await?;
        self.flush().await;
        Ok(())
    }
}

#[async_trait]
impl Enforcer for HostsFileBlock {
    fn name(&self) -> &'static str {
        "dns_block"
    }

    async fn is_enforced(&self) -> ControlResult<bool> {
        let contents = self.read().await?;
        Ok(block_entries(&contents).is_some_and(|entries| entries == self.expected_entries()))
    }

    async fn enforce(&self) -> ControlResult<()> {
        let contents = self.read().await?;
        if block_entries(&contents).is_some_and(|entries| entries == self.expected_entries()) {
            return Ok(());
        }

        let updated = with_block(&strip_block(&contents), &self.expected_entries());
        self.replace(&updated).await?;
        info!(domains = ?self.domains, path = %self.path.display(), "DNS block written");
        Ok(())
    }

    async fn release(&self) -> ControlResult<()> {
        let contents = self.read().await?;
        if !has_block(&contents) {
            return Ok(());
        }

        self.replace(&strip_block(&contents)).await?;
        info!(path = %self.path.display(), "DNS block removed");
        Ok(())
    }
}

#[async_trait]
impl DnsBlockController for HostsFileBlock {
    async fn reset(&self) -> ControlResult<()> {
        let contents = self.read().await?;
        let cleaned = strip_domain_lines(&strip_block(&contents), &self.domains);
        if cleaned == contents {
            info!(path = %self.path.display(), "Hosts file already clean");
            return Ok(());
        }

        self.replace(&cleaned).await?;
        info!(path = %self.path.display(), "Hosts file reset");
        Ok(())
    }
}

fn has_block(contents: &str) -> bool {
    contents.lines().any(|line| line.trim() == BLOCK_BEGIN)
}

/// Normalised entries inside the managed block, if there is one
pub fn block_entries(contents: &str) -> Option<Vec<String>> {
    let mut lines = contents.lines().map(str::trim);
    lines.by_ref().find(|line| *line == BLOCK_BEGIN)?;

    let mut entries = Vec::new();
    for line in lines {
        if line == BLOCK_END {
            return Some(entries);
        }
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        entries.push(line.split_whitespace().collect::<Vec<_>>().join(" "));
    }

    // Unterminated block never matches
    None
}

/// Remove the managed block. An unterminated block runs to end of file.
pub fn strip_block(contents: &str) -> String {
    let mut kept = Vec::new();
    let mut inside = false;

    for line in contents.lines() {
        match line.trim() {
            BLOCK_BEGIN => inside = true,
            BLOCK_END if inside => inside = false,
            _ if inside => {}
            _ => kept.push(line),
        }
    }

    join_lines(&kept)
}

/// Append a managed block
pub fn with_block(base: &str, entries: &[String]) -> String {
    let mut out = base.to_string();
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(BLOCK_BEGIN);
    out.push('\n');
    for entry in entries {
        out.push_str(entry);
        out.push('\n');
    }
    out.push_str(BLOCK_END);
    out.push('\n');
    out
}

/// Remove every mapping of `domains`, keeping the other names on each line.
/// A line left without any hostname is dropped.
pub fn strip_domain_lines(contents: &str, domains: &[String]) -> String {
    let kept: Vec<String> = contents
        .lines()
        .filter_map(|line| without_domains(line, domains))
        .collect();
    let kept: Vec<&str> = kept.iter().map(String::as_str).collect();

    join_lines(&kept)
}

fn without_domains(line: &str, domains: &[String]) -> Option<String> {
    let (entry, comment) = match line.find('#') {
        Some(idx) => line.split_at(idx),
        None => (line, ""),
    };

    let mut fields = entry.split_whitespace();
    let Some(address) = fields.next() else {
        return Some(line.to_string());
    };

    let hosts: Vec<&str> = fields.collect();
    let remaining: Vec<&str> = hosts
        .iter()
        .copied()
        .filter(|host| !domains.iter().any(|d| d.eq_ignore_ascii_case(host)))
        .collect();

    if remaining.len() == hosts.len() {
        return Some(line.to_string());
    }
    if remaining.is_empty() {
        return None;
    }

    let mut out = format!("{} {}", address, remaining.join(" "));
    if !comment.is_empty() {
        out.push(' ');
        out.push_str(comment);
    }
    Some(out)
}

fn join_lines(lines: &[&str]) -> String {
    if lines.is_empty() {
        return String::new();
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}
