//! Terminal rendering for reports, warnings and listings
//!
//! Color and spinners follow the configured verbosity; `--json` output
//! bypasses this module entirely.

use crate::cli::Verbosity;
use crate::pipeline::{AdvisoryStatus, TriageReport};
use crate::schema::{ClassLabelSpace, FeatureSchema};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt::Write as _;
use std::time::Duration;

/// Terminal display for the CLI
pub struct Display {
    verbosity: Verbosity,
    current_bar: Option<ProgressBar>,
    tick_interval: Duration,
}

impl Display {
    pub fn new(verbosity: Verbosity, color: bool) -> Self {
        if !color {
            colored::control::set_override(false);
        }
        Self {
            verbosity,
            current_bar: None,
            tick_interval: Duration::from_millis(100),
        }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Start a spinner for a pipeline stage
    pub fn start_stage(&mut self, message: &str) {
        self.finish_stage();
        if !self.verbosity.show_progress() {
            return;
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg} {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(self.tick_interval);
        self.current_bar = Some(pb);
    }

    /// Clear the current spinner
    pub fn finish_stage(&mut self) {
        if let Some(pb) = self.current_bar.take() {
            pb.finish_and_clear();
        }
    }

    pub fn show_report(&mut self, report: &TriageReport) {
        self.finish_stage();
        print!("{}", render_report(report, self.verbosity));
    }

    pub fn show_warning(&mut self, warning: &str) {
        self.finish_stage();
        eprintln!("{} {}", "Warning:".yellow().bold(), warning.yellow());
    }

    pub fn show_error(&mut self, error: &str) {
        self.finish_stage();
        eprintln!("{} {}", "Error:".red().bold(), error.red());
    }

    pub fn show_symptoms(&self, schema: &FeatureSchema) {
        println!("{}", format!("Recognised symptoms ({})", schema.len()).bold().cyan());
        for (idx, identifier) in schema.identifiers().iter().enumerate() {
            println!("  {:>3}  {}", idx, identifier);
        }
    }

    pub fn show_diseases(&self, labels: &ClassLabelSpace) {
        println!("{}", format!("Predictable diseases ({})", labels.len()).bold().cyan());
        for (idx, label) in labels.labels().iter().enumerate() {
            println!("  {:>3}  {}", idx, label);
        }
    }
}

impl Drop for Display {
    fn drop(&mut self) {
        self.finish_stage();
    }
}

/// Render a report as terminal text
pub fn render_report(report: &TriageReport, verbosity: Verbosity) -> String {
    let mut out = String::new();
    let bundle = &report.bundle;

    let headline = if bundle.is_negative() {
        bundle.predicted_disease.yellow().bold()
    } else {
        bundle.predicted_disease.green().bold()
    };
    let _ = writeln!(out, "\n{} {}", "Predicted disease:".bold(), headline);

    if verbosity != Verbosity::Quiet {
        if !report.matched_symptoms.is_empty() {
            let _ = writeln!(
                out,
                "{} {}",
                "Symptoms used:".dimmed(),
                report.matched_symptoms.join(", ")
            );
        }

        if !bundle.description.is_empty() {
            let _ = writeln!(out, "\n{}", bundle.description);
        }

        let _ = writeln!(out, "\n{} {}", "Advice:".bold().cyan(), bundle.advice);
        let _ = writeln!(out, "{} {}", "Note:".dimmed(), bundle.note.dimmed());
    }

    if verbosity.show_summary() {
        let _ = writeln!(out, "\n{}", "Ensemble".bold().cyan());
        for vote in &report.votes {
            let _ = writeln!(out, "  {:<16} class {:>3}  ({:?})", vote.model, vote.index, vote.duration);
        }
        let tie = if report.tally.is_tied() {
            " (tie, first-seen class kept)"
        } else {
            ""
        };
        let _ = writeln!(out, "  resolved to class {}{}", report.resolved_index, tie);

        if let (Some(direct), Some(assisted)) = (report.direct_matches, report.assisted_matches) {
            let _ = writeln!(out, "  matched {} directly, {} with assistance", direct, assisted);
        }
        let advisory = match &report.advisory {
            AdvisoryStatus::Provided => "provided".to_string(),
            AdvisoryStatus::Disabled => "disabled".to_string(),
            AdvisoryStatus::NotApplicable => "not applicable".to_string(),
            AdvisoryStatus::Failed(reason) => format!("failed: {}", reason),
        };
        let _ = writeln!(out, "  description {}", advisory);
        let _ = writeln!(out, "  request {}", report.request_id.to_string().dimmed());
    }

    for warning in &report.warnings {
        let _ = writeln!(out, "{} {}", "Warning:".yellow().bold(), warning.yellow());
    }

    out
}
