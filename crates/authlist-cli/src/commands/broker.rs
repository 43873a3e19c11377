//! Broker state commands: health, reset, status, pending, components, stop.

use anyhow::Result;
use colored::Colorize;

use authlist_broker::HealthSnapshot;

use crate::daemon_client::DaemonClient;
use crate::formatter::{OutputFormat, print_json};
use crate::theme::Theme;

fn print_health(health: &HealthSnapshot) {
    println!("  State: {}", Theme::health(health.state));
    println!("  Since: {}", health.since.to_rfc3339().dimmed());
    if let Some(reason) = &health.last_fault_reason {
        println!("  Last fault: {}", reason.yellow());
    }
}

/// Show broker health.
pub(crate) async fn health(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;
    if format == OutputFormat::Json {
        return print_json(&health);
    }
    println!("\n{}", Theme::header("Broker Health"));
    print_health(&health);
    println!();
    Ok(())
}

/// Return the broker to Normal.
pub(crate) async fn reset(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let health = client.reset().await?;
    if format == OutputFormat::Json {
        return print_json(&health);
    }
    println!("{}", Theme::success("Broker reset"));
    print_health(&health);
    Ok(())
}

/// Show daemon status.
pub(crate) async fn status(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let status = client.status().await?;
    if format == OutputFormat::Json {
        return print_json(&status);
    }
    println!("\n{}", Theme::header("Daemon Status"));
    println!("  Health: {}", Theme::health(status.health));
    println!("  Mode: {}", status.mode.to_string().cyan());
    println!("  Uptime: {}s", status.uptime_secs.to_string().yellow());
    println!("  Pending: {}", status.pending.to_string().yellow());
    println!("  Subsystems: {}", status.subsystems.to_string().yellow());
    println!("  Version: {}", status.version.cyan());
    println!();
    Ok(())
}

/// List decisions waiting on the approval service.
pub(crate) async fn pending(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let pending = client.pending().await?;
    if format == OutputFormat::Json {
        return print_json(&pending);
    }
    if pending.is_empty() {
        println!("{}", Theme::dimmed("No pending requests"));
        return Ok(());
    }
    println!("\n{}", Theme::header("Pending Requests"));
    for info in &pending {
        println!(
            "  {} {} token {} ({}s)",
            info.request_id.to_string().dimmed(),
            info.requester.cyan(),
            info.token.as_str().yellow(),
            info.age_secs,
        );
        if !info.authorize.is_empty() {
            println!("    + {}", info.authorize.join(", "));
        }
        if !info.unauthorize.is_empty() {
            println!("    - {}", info.unauthorize.join(", "));
        }
    }
    println!();
    Ok(())
}

/// List every authorizable component.
pub(crate) async fn components(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let components = client.components().await?;
    if format == OutputFormat::Json {
        return print_json(&components);
    }
    for name in &components {
        println!("{name}");
    }
    Ok(())
}

/// Ask the daemon to shut down.
pub(crate) async fn stop(client: &DaemonClient) -> Result<()> {
    client.shutdown().await?;
    println!("{}", Theme::success("Daemon shutdown requested"));
    Ok(())
}
