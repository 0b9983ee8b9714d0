//! The seam between output classification and the logging collaborator.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::diag::Diagnostic;

/// Importance level a non-diagnostic line is relayed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageImportance {
    /// Routine tool chatter.
    Low,
    /// Ordinary informational output.
    Normal,
    /// Output that should surface prominently.
    High,
}

/// Receives structured diagnostics and plain messages from a tool run.
///
/// Implementations must tolerate concurrent calls; the orchestrator emits
/// from a single task, but sinks are shared across runs.
pub trait DiagnosticSink: Send + Sync {
    /// One parsed error or warning.
    fn diagnostic(&self, diag: &Diagnostic);

    /// One line that was not a diagnostic.
    fn message(&self, importance: MessageImportance, text: &str);
}

/// Everything a [`CollectingSink`] captured.
#[derive(Debug, Default, Clone)]
pub struct CollectedOutput {
    /// Diagnostics in emission order.
    pub diagnostics: Vec<Diagnostic>,
    /// Plain messages in emission order.
    pub messages: Vec<(MessageImportance, String)>,
}

/// Sink that stores everything it receives, for tests and batch consumers.
#[derive(Debug, Default)]
pub struct CollectingSink {
    inner: Mutex<CollectedOutput>,
}

impl CollectingSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything captured so far.
    #[must_use]
    pub fn collected(&self) -> CollectedOutput {
        self.lock().clone()
    }

    /// Diagnostics captured so far.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.lock().diagnostics.clone()
    }

    /// Plain messages captured so far.
    #[must_use]
    pub fn messages(&self) -> Vec<(MessageImportance, String)> {
        self.lock().messages.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CollectedOutput> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl DiagnosticSink for CollectingSink {
    fn diagnostic(&self, diag: &Diagnostic) {
        self.lock().diagnostics.push(diag.clone());
    }

    fn message(&self, importance: MessageImportance, text: &str) {
        self.lock().messages.push((importance, text.to_string()));
    }
}
