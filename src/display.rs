//! Colored CLI display for diagnostics and tool messages.

use std::io::{self, Write};

use chrono::Utc;
use owo_colors::OwoColorize;

use crate::diag::{Diagnostic, Severity};
use crate::orchestrator::{DiagnosticSink, MessageImportance};

/// Get current timestamp in the same format as tracing.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// How the console sink renders records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored lines.
    Text,
    /// One JSON object per line.
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Sink that prints every record to the terminal.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleSink {
    format: OutputFormat,
}

impl ConsoleSink {
    /// Create a sink with the given output format.
    #[must_use]
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl DiagnosticSink for ConsoleSink {
    fn diagnostic(&self, diag: &Diagnostic) {
        match self.format {
            OutputFormat::Text => print_diagnostic(diag),
            OutputFormat::Json => {
                print_json(&serde_json::json!({ "kind": "diagnostic", "diagnostic": diag }));
            }
        }
    }

    fn message(&self, importance: MessageImportance, text: &str) {
        match self.format {
            OutputFormat::Text => print_message(importance, text),
            OutputFormat::Json => {
                print_json(
                    &serde_json::json!({ "kind": "message", "importance": importance, "text": text }),
                );
            }
        }
    }
}

fn print_json(value: &serde_json::Value) {
    println!("{value}");
    let _ = io::stdout().flush();
}

/// Print one diagnostic with a severity-colored tag.
pub fn print_diagnostic(diag: &Diagnostic) {
    match diag.severity {
        Severity::Error => println!(
            "{} {} {diag}",
            timestamp().dimmed(),
            "[ERROR]".red().bold(),
        ),
        Severity::Warning => println!(
            "{} {} {diag}",
            timestamp().dimmed(),
            "[WARN]".yellow().bold(),
        ),
    }
    let _ = io::stdout().flush();
}

/// Print one plain tool message.
pub fn print_message(importance: MessageImportance, text: &str) {
    match importance {
        MessageImportance::Low => println!("{} {}", timestamp().dimmed(), text.dimmed()),
        MessageImportance::Normal => println!("{} {text}", timestamp().dimmed()),
        MessageImportance::High => println!("{} {}", timestamp().dimmed(), text.bold()),
    }
    let _ = io::stdout().flush();
}

/// Print the final run verdict.
pub fn print_outcome(tool: &str, success: bool, exit_code: i32) {
    if success {
        println!(
            "{} {} {tool} finished (exit code {exit_code})",
            timestamp().dimmed(),
            "[DONE]".green().bold(),
        );
    } else {
        println!(
            "{} {} {tool} failed (exit code {exit_code})",
            timestamp().dimmed(),
            "[FAIL]".red().bold(),
        );
    }
    let _ = io::stdout().flush();
}
