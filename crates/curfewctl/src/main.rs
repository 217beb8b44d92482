//! curfewctl - Admin CLI for the curfew policy store
//!
//! Reads and changes the lock flag and YouTube budget of each workstation.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use curfew_api::{ClientConfigBody, ClientListResponse, MutationResponse, Policy, PolicySource};
use curfew_client::PolicyClient;
use curfew_util::{AgentId, format_datetime_full, format_duration};
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// curfewctl - Manage workstation policies
#[derive(Parser, Debug)]
#[command(name = "curfewctl")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Policy store base URL (or set CURFEW_ENDPOINT env var)
    #[arg(short, long, env = "CURFEW_ENDPOINT", default_value = "http://localhost:8000")]
    endpoint: String,

    /// Request timeout in seconds
    #[arg(long, default_value = "10")]
    timeout: u64,

    /// Print raw JSON instead of text
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the policy a workstation would fetch
    Status {
        /// Workstation identity
        id: String,
    },

    /// List all workstations
    #[command(alias = "ls")]
    List,

    /// Lock a workstation
    Lock {
        /// Workstation identity
        id: String,
    },

    /// Allow a workstation to be unlocked
    Unlock {
        /// Workstation identity
        id: String,
    },

    /// Set the YouTube budget
    Timer {
        /// Workstation identity
        id: String,
        /// Budget in seconds
        seconds: u32,
    },

    /// Set the lock flag and the YouTube budget together
    Configure {
        /// Workstation identity
        id: String,
        /// Allow unlocking
        #[arg(long, action = clap::ArgAction::Set)]
        unlock: bool,
        /// Budget in seconds
        #[arg(long)]
        timer: u32,
    },

    /// Remove a workstation from the store
    Delete {
        /// Workstation identity
        id: String,
    },

    /// Check that the store is up
    Ping,
}

fn parse_id(id: &str) -> Result<AgentId> {
    AgentId::parse(id).with_context(|| format!("Invalid workstation identity '{}'", id))
}

fn render_policy(id: &AgentId, policy: &Policy) -> String {
    let mut out = format!(
        "{}\n  unlock allowed: {}\n  youtube budget: {}",
        id,
        if policy.unlock_allowed { "yes" } else { "no" },
        format_duration(Duration::from_secs(u64::from(policy.youtube_timer_seconds)))
    );
    if let Some(updated) = &policy.last_updated {
        out.push_str(&format!("\n  last updated:   {}", format_datetime_full(updated)));
    }
    out
}

fn render_list(list: &ClientListResponse) -> String {
    if list.clients.is_empty() {
        return "No workstations registered".into();
    }

    let width = list
        .clients
        .iter()
        .map(|c| c.name.len())
        .max()
        .unwrap_or(0)
        .max("NAME".len());

    let mut lines = vec![format!("{:<width$}  UNLOCK  BUDGET  LAST UPDATED", "NAME")];
    for client in &list.clients {
        let budget = u64::try_from(client.youtube_timer_seconds)
            .map(|secs| format_duration(Duration::from_secs(secs)))
            .unwrap_or_else(|_| client.youtube_timer_seconds.to_string());
        lines.push(format!(
            "{:<width$}  {:<6}  {:<6}  {}",
            client.name,
            if client.unlock_allowed { "yes" } else { "no" },
            budget,
            client.last_updated.as_deref().unwrap_or("-"),
        ));
    }
    lines.push(format!("{} workstation(s)", list.total_clients));
    lines.join("\n")
}

fn render_ack(response: &MutationResponse, fallback: &str) -> String {
    response
        .message
        .clone()
        .unwrap_or_else(|| fallback.to_string())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let client = PolicyClient::new(&cli.endpoint, Duration::from_secs(cli.timeout));
    debug!(endpoint = %client.endpoint(), "Using policy store");

    match cli.command {
        Commands::Status { id } => {
            let id = parse_id(&id)?;
            let policy = client
                .fetch_policy(&id)
                .await
                .with_context(|| format!("Failed to fetch policy for {}", id))?;
            if cli.json {
                print_json(&policy)?;
            } else {
                println!("{}", render_policy(&id, &policy));
            }
        }

        Commands::List => {
            let list = client.list_clients().await.context("Failed to list workstations")?;
            if cli.json {
                print_json(&list)?;
            } else {
                println!("{}", render_list(&list));
            }
        }

        Commands::Lock { id } => {
            let id = parse_id(&id)?;
            let response = client.set_unlock(&id, false).await?;
            println!("{}", render_ack(&response, &format!("{} locked", id)));
        }

        Commands::Unlock { id } => {
            let id = parse_id(&id)?;
            let response = client.set_unlock(&id, true).await?;
            println!("{}", render_ack(&response, &format!("{} unlocked", id)));
        }

        Commands::Timer { id, seconds } => {
            let id = parse_id(&id)?;
            let response = client.set_timer(&id, seconds).await?;
            let fallback = format!(
                "{} budget set to {}",
                id,
                format_duration(Duration::from_secs(u64::from(seconds)))
            );
            println!("{}", render_ack(&response, &fallback));
        }

        Commands::Configure { id, unlock, timer } => {
            let id = parse_id(&id)?;
            let body = ClientConfigBody {
                unlock_allowed: unlock,
                youtube_timer_seconds: timer,
            };
            let response = client.configure(&id, &body).await?;
            println!("{}", render_ack(&response, &format!("{} configured", id)));
        }

        Commands::Delete { id } => {
            let id = parse_id(&id)?;
            let response = client.delete_client(&id).await?;
            println!("{}", render_ack(&response, &format!("{} deleted", id)));
        }

        Commands::Ping => {
            let health = client.health().await.context("Policy store is not responding")?;
            println!("{}: {}", client.endpoint(), health.message);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    run(cli).await
}
