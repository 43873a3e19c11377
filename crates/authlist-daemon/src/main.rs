//! Authlist daemon - serves the authorization broker over JSON-RPC.
//!
//! Loads configuration, sets up logging, builds the broker (spawning the
//! approval poller in external mode) and serves it until Ctrl-C or a
//! `shutdown` call.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::unwrap_used)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing::info;

use authlist_config::{Config, LoadOptions};
use authlist_daemon::DaemonServer;
use authlist_telemetry::{LogConfig, setup_logging};

/// Authlist daemon
#[derive(Parser)]
#[command(name = "authlistd")]
#[command(author, version, about = "Authorization broker daemon", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let resolved = Config::load(&LoadOptions {
        explicit: args.config.clone(),
        ..LoadOptions::default()
    })
    .context("failed to load configuration")?;
    let cfg = resolved.config;

    let mut log_config =
        LogConfig::try_from(&cfg.logging).context("invalid logging configuration")?;
    if args.verbose {
        log_config.level = "debug".to_string();
    }
    if let Err(e) = setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }
    for file in &resolved.loaded_files {
        info!(file = %file, "configuration loaded");
    }

    let (daemon, handle, addr) = DaemonServer::start(&cfg).await?;

    println!(
        "{} listening on {} ({} mode)",
        "authlistd".cyan().bold(),
        addr,
        daemon.broker().mode()
    );

    let mut shutdown_rx = daemon.subscribe_shutdown();
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = shutdown_rx.recv() => {},
    }

    println!("{}", "Shutting down...".yellow());
    daemon.stop(handle).await;
    println!("{}", "Daemon stopped.".green());

    Ok(())
}
