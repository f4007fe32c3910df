//! Fleet Audit - Main entry point
//!
//! One subcommand per audit, driven by JSON descriptors.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use fleet_audit::config;
use fleet_audit::remote::ssh::{SshSession, SshTarget};
use fleet_audit::report::Reporter;
use fleet_audit::services::{backup_check, compose_check, process_check, structure_check};
use fleet_audit::utils;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding the JSON audit descriptors
    #[arg(short, long, value_name = "DIR", default_value = "descriptors")]
    descriptors: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Audit backup freshness, completeness and size trend
    Backups,
    /// Audit app-server file and folder structure
    Structure,
    /// Audit container exit statuses
    Processes,
    /// Audit docker compose files for required keys
    Compose,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    utils::logger::init(args.log_level.as_deref().unwrap_or("info"))?;

    tracing::info!("Starting fleet-audit v{}", env!("CARGO_PKG_VERSION"));

    // All remote work is blocking libssh2; keep it off the async runtime.
    tokio::task::spawn_blocking(move || run(args)).await?
}

fn run(args: Args) -> Result<()> {
    let mut report = Reporter::stdout();
    let timeout_ms = config::ssh_timeout_from_env();

    match args.command {
        Command::Backups => {
            let content: config::BackupContentConfig =
                config::load_descriptor(&args.descriptors.join("backup_content.json"))?;
            let locations: config::BackupLocationsConfig =
                config::load_descriptor(&args.descriptors.join("backup_locations.json"))?;

            let env = config::BackupServerEnv::from_env()?;
            let session = SshSession::connect(&SshTarget {
                host: env.host,
                port: env.port,
                username: env.username,
                password: env.password,
                timeout_ms,
            })?;

            let today = chrono::Local::now().date_naive();
            let outcome = backup_check::run(&session, &content, &locations, today, &mut report)?;
            tracing::info!(clean = outcome.is_clean(), "Backup audit finished");
        }
        Command::Structure => {
            let servers: config::AppServersConfig =
                config::load_descriptor(&args.descriptors.join("app_servers.json"))?;
            structure_check::run(&servers, timeout_ms, &mut report)?;
        }
        Command::Processes => {
            let servers: config::ProcessServersConfig =
                config::load_descriptor(&args.descriptors.join("process_servers.json"))?;
            process_check::run(&servers, timeout_ms, &mut report)?;
        }
        Command::Compose => {
            let servers: config::ComposeServersConfig =
                config::load_descriptor(&args.descriptors.join("compose_keys.json"))?;
            compose_check::run(&servers, timeout_ms, &mut report)?;
        }
    }

    Ok(())
}
