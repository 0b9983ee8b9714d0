//! Diagnostic record types.

use serde::Serialize;

/// Severity of a parsed diagnostic line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The tool reported an error.
    Error,
    /// The tool reported a warning.
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// One structured diagnostic extracted from a line of tool output.
///
/// Line and column fields use 0 to mean "unknown/unspecified". The record is
/// emitted to the sink immediately after parsing and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Tool or file name portion of the line; may be empty when the line
    /// carried no explicit origin.
    pub origin: String,
    /// First line of the source span, 0 if unspecified.
    pub start_line: u32,
    /// First column of the source span, 0 if unspecified.
    pub start_col: u32,
    /// Last line of the source span, 0 if unspecified.
    pub end_line: u32,
    /// Last column of the source span, 0 if unspecified.
    pub end_col: u32,
    /// Tool-defined subcategory, e.g. `fatal` or `Command line`; may be empty.
    pub subcategory: String,
    /// Whether the tool reported an error or a warning.
    pub severity: Severity,
    /// Tool-defined diagnostic code, e.g. `CS0001`.
    pub code: String,
    /// Free-form message text; may be empty, never absent.
    pub message: String,
}

impl Diagnostic {
    /// True when the diagnostic carries error severity.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.origin.is_empty() {
            write!(f, "{}", self.origin)?;
            if self.start_line != 0 {
                write!(f, "({},{})", self.start_line, self.start_col)?;
            }
            write!(f, ": ")?;
        }
        if !self.subcategory.is_empty() {
            write!(f, "{} ", self.subcategory)?;
        }
        write!(f, "{} {}: {}", self.severity, self.code, self.message)
    }
}
