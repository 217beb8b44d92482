//! curfewd - The curfew workstation agent
//!
//! This is the main entry point for the agent. It wires together:
//! - Configuration loading and CLI overrides
//! - The policy store client
//! - Linux session lock and hosts-file DNS block
//! - The agent poll loop
//! - Signal handling

use anyhow::{Context, Result, bail, ensure};
use clap::{Parser, ValueEnum};
use curfew_client::PolicyClient;
use curfew_config::{
    AgentConfig, MAX_POLL_INTERVAL_SECONDS, load_config, load_config_or_default, validate_endpoint,
};
use curfew_core::{AgentLoop, LoopSettings};
use curfew_host_api::DnsBlockController;
use curfew_host_linux::{HostsFileBlock, LoginctlSessionLock, detect_capabilities, is_privileged};
use curfew_util::{AgentId, default_config_path, system_config_path};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// curfewd - Remote lock and YouTube budget enforcement
#[derive(Parser, Debug)]
#[command(name = "curfewd")]
#[command(about = "Remote lock and YouTube budget enforcement", long_about = None)]
struct Args {
    /// Agent identity in the policy store (default: config file, then hostname)
    identity: Option<String>,

    /// Configuration file path (default: ~/.config/curfew/config.toml, then /etc/curfew/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Policy store base URL (or set CURFEW_ENDPOINT env var)
    #[arg(short, long, env = "CURFEW_ENDPOINT")]
    endpoint: Option<String>,

    /// Seconds between policy polls
    #[arg(short, long)]
    interval: Option<u64>,

    /// Seconds before a policy fetch counts as unreachable
    #[arg(long)]
    fetch_timeout: Option<u64>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Remove every DNS block entry for the managed domains, then exit
    #[arg(long)]
    reset_dns: bool,
}

/// Effective agent settings after CLI overrides
#[derive(Debug)]
struct Resolved {
    identity: AgentId,
    endpoint: String,
    settings: LoopSettings,
}

fn init_logging(args: &Args) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match args.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Load the named config file, or the first default location that exists
fn load_agent_config(explicit: Option<&Path>) -> Result<AgentConfig> {
    if let Some(path) = explicit {
        let config = load_config(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?;
        info!(config_path = %path.display(), "Configuration loaded");
        return Ok(config);
    }

    let user_path = default_config_path();
    let path = if user_path.exists() {
        user_path
    } else {
        system_config_path()
    };

    let config = load_config_or_default(&path)
        .with_context(|| format!("Failed to load config from {:?}", path))?;
    info!(config_path = %path.display(), "Configuration resolved");
    Ok(config)
}

fn resolve(args: &Args, config: &AgentConfig) -> Result<Resolved> {
    let identity = match &args.identity {
        Some(id) => AgentId::parse(id.clone()).context("Invalid identity argument")?,
        None => match &config.agent.identity {
            Some(id) => id.clone(),
            None => AgentId::from_hostname().context("Failed to derive identity from hostname")?,
        },
    };

    let endpoint = match &args.endpoint {
        Some(endpoint) => {
            validate_endpoint(endpoint).map_err(anyhow::Error::msg)?;
            endpoint.clone()
        }
        None => config.agent.store_endpoint.clone(),
    };

    let poll_interval = match args.interval {
        Some(secs) => {
            ensure!(
                (1..=MAX_POLL_INTERVAL_SECONDS).contains(&secs),
                "--interval must be between 1 and {}",
                MAX_POLL_INTERVAL_SECONDS
            );
            Duration::from_secs(secs)
        }
        None => config.agent.poll_interval,
    };

    let fetch_timeout = match args.fetch_timeout {
        Some(0) => bail!("--fetch-timeout must be at least 1"),
        Some(secs) => Duration::from_secs(secs),
        None => config.agent.fetch_timeout.min(poll_interval),
    };

    ensure!(
        fetch_timeout <= poll_interval,
        "fetch timeout ({}s) exceeds poll interval ({}s)",
        fetch_timeout.as_secs(),
        poll_interval.as_secs()
    );

    Ok(Resolved {
        identity,
        endpoint,
        settings: LoopSettings {
            poll_interval,
            fetch_timeout,
        },
    })
}

/// Flip `shutdown` on the first termination signal
async fn forward_signals(shutdown: watch::Sender<bool>) -> Result<()> {
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
    let mut sigint =
        signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
    let mut sighup = signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully"),
            _ = sigint.recv() => info!("Received SIGINT, shutting down gracefully"),
            _ = sighup.recv() => info!("Received SIGHUP, shutting down gracefully"),
        }
        let _ = shutdown.send(true);
    });

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    info!(version = env!("CARGO_PKG_VERSION"), "curfewd starting");

    if curfew_util::is_mock_time_active() {
        warn!("Mock time is active; budget accounting follows the mocked clock");
    }

    let config = load_agent_config(args.config.as_deref())?;

    let dns = Arc::new(HostsFileBlock::new(
        config.dns.hosts_path.clone(),
        config.dns.redirect_address,
        config.dns.domains.clone(),
        config.dns.flush_command.clone(),
    ));

    if args.reset_dns {
        dns.reset().await.context("Failed to reset DNS blocking")?;
        info!(hosts_path = %dns.path().display(), "DNS blocking reset");
        return Ok(());
    }

    let resolved = resolve(&args, &config)?;

    if !is_privileged() {
        warn!("Not running as root; locking and DNS blocking will likely fail");
    }
    let capabilities = detect_capabilities(&config.dns.hosts_path, &config.dns.flush_command);
    info!(?capabilities, "Host capabilities detected");

    let lock = Arc::new(LoginctlSessionLock::for_session(&config.lock.session));
    let client = Arc::new(PolicyClient::new(
        &resolved.endpoint,
        resolved.settings.fetch_timeout,
    ));

    info!(
        identity = %resolved.identity,
        endpoint = %resolved.endpoint,
        session = %config.lock.session,
        domains = ?config.dns.domains,
        "Agent configured"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    forward_signals(shutdown_tx).await?;

    let agent = AgentLoop::new(resolved.identity, client, lock, dns, resolved.settings);
    let snapshot = agent.run(shutdown_rx).await;

    info!(
        consecutive_failures = snapshot.consecutive_failures,
        remaining_budget_secs = snapshot.state.remaining_budget_seconds,
        "Shutdown complete"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("curfewd").chain(argv.iter().copied())).unwrap()
    }

    fn config_with_identity() -> AgentConfig {
        let mut config = AgentConfig::default();
        config.agent.identity = Some(AgentId::parse("from-config").unwrap());
        config
    }

    #[test]
    fn positional_identity_wins() {
        let resolved = resolve(&args(&["kids-pc"]), &config_with_identity()).unwrap();
        assert_eq!(resolved.identity.as_str(), "kids-pc");
    }

    #[test]
    fn config_identity_used_without_argument() {
        let resolved = resolve(&args(&[]), &config_with_identity()).unwrap();
        assert_eq!(resolved.identity.as_str(), "from-config");
        assert_eq!(resolved.endpoint, curfew_config::DEFAULT_STORE_ENDPOINT);
    }

    #[test]
    fn invalid_identity_rejected() {
        assert!(resolve(&args(&["kids pc"]), &config_with_identity()).is_err());
    }

    #[test]
    fn interval_override_clamps_default_timeout() {
        let resolved = resolve(&args(&["--interval", "2"]), &config_with_identity()).unwrap();
        assert_eq!(resolved.settings.poll_interval, Duration::from_secs(2));
        assert_eq!(resolved.settings.fetch_timeout, Duration::from_secs(2));
    }

    #[test]
    fn explicit_timeout_over_interval_rejected() {
        let result = resolve(
            &args(&["--interval", "5", "--fetch-timeout", "10"]),
            &config_with_identity(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn endpoint_override_is_validated() {
        let config = config_with_identity();
        assert!(resolve(&args(&["--endpoint", "store:8000"]), &config).is_err());

        let resolved = resolve(&args(&["--endpoint", "https://store.example"]), &config).unwrap();
        assert_eq!(resolved.endpoint, "https://store.example");
    }

    #[test]
    fn log_format_parses() {
        assert_eq!(args(&["--log-format", "json"]).log_format, LogFormat::Json);
        assert_eq!(args(&[]).log_format, LogFormat::Text);
        assert!(args(&["--reset-dns"]).reset_dns);
    }

    #[test]
    fn explicit_missing_config_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_agent_config(Some(dir.path().join("missing.toml").as_path())).is_err());
    }
}
