//! `authlist watch`: stream outcomes as they finish.

use anyhow::Result;

use crate::daemon_client::DaemonClient;
use crate::formatter::{OutputFormat, print_outcome};
use crate::theme::Theme;

/// Print every outcome until the daemon goes away or Ctrl-C.
pub(crate) async fn watch(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let mut outcomes = client.subscribe_outcomes().await?;
    if format == OutputFormat::Pretty {
        println!("{}", Theme::dimmed("Watching outcomes, Ctrl-C to stop"));
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            next = outcomes.next() => {
                let Some(next) = next else {
                    eprintln!("{}", Theme::error("Connection to daemon lost"));
                    return Ok(());
                };
                match next {
                    Ok(outcome) => print_outcome(&outcome, format)?,
                    Err(e) => eprintln!(
                        "{}",
                        Theme::warning(&format!("Outcome deserialization error: {e}"))
                    ),
                }
            },
        }
    }
}
