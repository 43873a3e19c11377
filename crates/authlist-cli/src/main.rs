//! Authlist CLI - command-line client for the authorization broker.
//!
//! A thin client: every subcommand is one or two JSON-RPC calls to a running
//! `authlistd`.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod daemon_client;
mod formatter;
mod theme;

use commands::{broker, request, watch};
use daemon_client::DaemonClient;
use formatter::OutputFormat;
use theme::Theme;

/// Authlist - authorization broker client
#[derive(Parser)]
#[command(name = "authlist")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format: pretty (default) or json
    #[arg(long, global = true, default_value = "pretty")]
    format: String,

    /// Daemon URL (defaults to the configured listen address)
    #[arg(long, global = true, env = "AUTHLIST_DAEMON_URL")]
    url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask for control authority to change
    Request {
        /// Who is asking; `me` expands to user@host
        requester: String,

        /// Components to authorize, comma separated
        #[arg(short, long, value_delimiter = ',')]
        authorize: Vec<String>,

        /// Components to revoke, comma separated
        #[arg(short, long, value_delimiter = ',')]
        unauthorize: Vec<String>,

        /// Wait up to this many seconds for a deferred decision
        #[arg(short, long)]
        wait: Option<u64>,
    },

    /// Show broker health
    Health,

    /// Clear a fault and resume accepting requests
    Reset,

    /// Show daemon status
    Status,

    /// List requests waiting on the approval service
    Pending,

    /// List authorizable components
    Components,

    /// Stream request outcomes as they finish
    Watch,

    /// Stop the daemon
    Shutdown,
}

/// Daemon URL from the flag/env, falling back to the configured listen address.
fn daemon_url(explicit: Option<String>) -> String {
    if let Some(url) = explicit {
        return url;
    }
    let listen = authlist_config::Config::load(&authlist_config::LoadOptions::default())
        .map(|r| r.config.rpc.listen)
        .unwrap_or_else(|_| authlist_config::RpcSection::default().listen);
    format!("ws://{listen}")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    let log_config = authlist_telemetry::LogConfig::new(level)
        .with_format(authlist_telemetry::LogFormat::Compact);
    if let Err(e) = authlist_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let format = OutputFormat::parse(&cli.format);
    let url = daemon_url(cli.url);
    let client = match DaemonClient::connect(&url).await {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{}", Theme::error(&e.to_string()));
            std::process::exit(1);
        },
    };

    let result = match cli.command {
        Commands::Request {
            requester,
            authorize,
            unauthorize,
            wait,
        } => {
            request::run_request(
                &client,
                &requester,
                authorize,
                unauthorize,
                wait.map(Duration::from_secs),
                format,
            )
            .await
        },
        Commands::Health => broker::health(&client, format).await,
        Commands::Reset => broker::reset(&client, format).await,
        Commands::Status => broker::status(&client, format).await,
        Commands::Pending => broker::pending(&client, format).await,
        Commands::Components => broker::components(&client, format).await,
        Commands::Watch => watch::watch(&client, format).await,
        Commands::Shutdown => broker::stop(&client).await,
    };

    if let Err(e) = result {
        eprintln!("{}", Theme::error(&e.to_string()));
        std::process::exit(1);
    }
    Ok(())
}
