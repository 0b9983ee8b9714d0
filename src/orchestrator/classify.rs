//! Per-line classification of tool output.
//!
//! Every reassembled line takes one of four paths: recognized tool status
//! banners are suppressed outright; a fatal-runtime banner flips the run
//! into an aggregation mode that buffers the rest of the output verbatim;
//! a line the parser accepts becomes a structured diagnostic; everything
//! else is relayed as a plain message at the stream's importance level.

use std::sync::Arc;

use regex::Regex;

use crate::diag::{parse_diagnostic, Diagnostic, Severity};
use crate::process::StreamSource;

use super::{DiagnosticSink, MessageImportance};

/// Tool-internal status lines that are neither diagnostics nor messages.
const SUPPRESSED_PATTERNS: &[&str] = &[
    r"^\s*Compilation succeeded\b",
    r"^\s*Compilation failed\b",
    r"^\s*Writing symbol file\b",
];

/// Banner that marks the start of a tool runtime crash dump.
const FATAL_BANNER_PATTERN: &str = r"^\s*Unhandled Exception\b";

/// Classifies reassembled output lines and emits them to a sink.
pub struct OutputClassifier {
    tool_name: String,
    stdout_importance: MessageImportance,
    stderr_importance: MessageImportance,
    suppressed: Vec<Regex>,
    fatal_banner: Option<Regex>,
    fatal_buffer: Option<Vec<String>>,
    errors: u32,
    warnings: u32,
    sink: Arc<dyn DiagnosticSink>,
}

impl OutputClassifier {
    /// Create a classifier for one tool run.
    ///
    /// `tool_name` becomes the origin of diagnostics that carry none of
    /// their own.
    #[must_use]
    pub fn new(
        tool_name: impl Into<String>,
        stdout_importance: MessageImportance,
        stderr_importance: MessageImportance,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            stdout_importance,
            stderr_importance,
            suppressed: SUPPRESSED_PATTERNS
                .iter()
                .filter_map(|pattern| Regex::new(pattern).ok())
                .collect(),
            fatal_banner: Regex::new(FATAL_BANNER_PATTERN).ok(),
            fatal_buffer: None,
            errors: 0,
            warnings: 0,
            sink,
        }
    }

    /// Number of error diagnostics emitted so far.
    #[must_use]
    pub fn errors(&self) -> u32 {
        self.errors
    }

    /// Number of warning diagnostics emitted so far.
    #[must_use]
    pub fn warnings(&self) -> u32 {
        self.warnings
    }

    /// Classify one complete line.
    pub fn classify_line(&mut self, source: StreamSource, line: &str) {
        if let Some(buffer) = &mut self.fatal_buffer {
            buffer.push(line.to_string());
            return;
        }

        if self
            .fatal_banner
            .as_ref()
            .is_some_and(|re| re.is_match(line))
        {
            tracing::debug!(tool = %self.tool_name, "fatal runtime banner detected; aggregating output");
            self.fatal_buffer = Some(vec![line.to_string()]);
            return;
        }

        if self.suppressed.iter().any(|re| re.is_match(line)) {
            tracing::trace!(%source, line, "suppressed tool status line");
            return;
        }

        match parse_diagnostic(line) {
            Some(mut diag) => {
                if diag.origin.is_empty() {
                    diag.origin = self.tool_name.clone();
                }
                match diag.severity {
                    Severity::Error => self.errors += 1,
                    Severity::Warning => self.warnings += 1,
                }
                self.sink.diagnostic(&diag);
            }
            None => {
                let importance = match source {
                    StreamSource::Stdout => self.stdout_importance,
                    StreamSource::Stderr => self.stderr_importance,
                };
                self.sink.message(importance, line);
            }
        }
    }

    /// Finish the run, emitting the aggregated crash output if any.
    ///
    /// Called exactly once, after the process has exited and both streams
    /// were flushed, so a fragmented stack trace surfaces as one error
    /// instead of dozens of unrelated diagnostics.
    pub fn finish(&mut self) {
        if let Some(buffer) = self.fatal_buffer.take() {
            let diag = Diagnostic {
                origin: self.tool_name.clone(),
                start_line: 0,
                start_col: 0,
                end_line: 0,
                end_col: 0,
                subcategory: String::new(),
                severity: Severity::Error,
                code: String::new(),
                message: buffer.join("\n"),
            };
            self.errors += 1;
            self.sink.diagnostic(&diag);
        }
    }

    /// Emit a synthesized error, counted like a parsed one.
    pub fn emit_error(&mut self, message: &str) {
        let diag = Diagnostic {
            origin: self.tool_name.clone(),
            start_line: 0,
            start_col: 0,
            end_line: 0,
            end_col: 0,
            subcategory: String::new(),
            severity: Severity::Error,
            code: String::new(),
            message: message.to_string(),
        };
        self.errors += 1;
        self.sink.diagnostic(&diag);
    }
}
