//! Output rendering for pretty and JSON modes.

use colored::Colorize;
use serde::Serialize;

use authlist_core::{ComponentResult, Disposition, RequestOutcome};

use crate::theme::Theme;

/// Output format selected with `--format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    /// Coloured, human-readable text.
    Pretty,
    /// One JSON document per result.
    Json,
}

impl OutputFormat {
    pub(crate) fn parse(text: &str) -> Self {
        match text {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Print `value` as pretty JSON.
pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn disposition_label(disposition: Disposition) -> String {
    match disposition {
        Disposition::Applied => "applied".green().to_string(),
        Disposition::Rejected => "rejected".red().to_string(),
        Disposition::Expired => "expired".yellow().to_string(),
    }
}

/// Render one outcome as text lines.
pub(crate) fn outcome_lines(outcome: &RequestOutcome) -> Vec<String> {
    let request = outcome.request();
    let mut lines = vec![format!(
        "{} {} for {} ({})",
        Theme::header("Request"),
        request.id,
        request.requester,
        disposition_label(outcome.disposition()),
    )];
    for (name, result) in outcome.results() {
        let verb = if request.authorize.contains(name) {
            "authorize"
        } else {
            "unauthorize"
        };
        lines.push(match result {
            ComponentResult::Succeeded => {
                format!("  {} {name} {}", "✓".green(), Theme::dimmed(verb))
            },
            ComponentResult::Failed { reason } => {
                format!("  {} {name} {} {}", "✗".red(), Theme::dimmed(verb), reason.red())
            },
        });
    }
    lines
}

/// Print one outcome in the selected format.
pub(crate) fn print_outcome(outcome: &RequestOutcome, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(outcome),
        OutputFormat::Pretty => {
            for line in outcome_lines(outcome) {
                println!("{line}");
            }
            Ok(())
        },
    }
}
