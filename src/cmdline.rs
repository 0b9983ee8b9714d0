//! Command-line assembly for external tools.
//!
//! This module provides a builder that grows a single command-line string
//! from switches, file paths, and delimited lists, applying the quoting
//! rules expected by compiler-style tools.

/// Incrementally builds a command-line string.
///
/// Each appended unit is preceded by exactly one separating space when the
/// buffer is non-empty, and never otherwise. A file or argument token is
/// wrapped in double quotes if and only if it contains ASCII whitespace.
/// Embedded double quotes are not escaped; tools that need them must quote
/// upstream. This is a documented limitation, not something the builder
/// silently works around.
#[derive(Debug, Clone, Default)]
pub struct CommandLineBuilder {
    buffer: String,
}

impl CommandLineBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True if nothing has been appended yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// View the assembled command line so far.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    /// Consume the builder, yielding the assembled command line.
    #[must_use]
    pub fn into_string(self) -> String {
        self.buffer
    }

    fn append_separator(&mut self) {
        if !self.buffer.is_empty() {
            self.buffer.push(' ');
        }
    }

    fn append_quoted(&mut self, token: &str) {
        if needs_quoting(token) {
            self.buffer.push('"');
            self.buffer.push_str(token);
            self.buffer.push('"');
        } else {
            self.buffer.push_str(token);
        }
    }

    /// Append a switch verbatim, e.g. `/nologo` or `--emit-ir`.
    pub fn append_switch(&mut self, switch: &str) {
        self.append_separator();
        self.buffer.push_str(switch);
    }

    /// Append a switch when present; an absent switch is skipped without error.
    pub fn append_switch_if_some(&mut self, switch: Option<&str>) {
        if let Some(switch) = switch {
            self.append_switch(switch);
        }
    }

    /// Append a switch immediately followed by a quoted value, e.g.
    /// `/out:"My File.dll"`.
    pub fn append_switch_with_value(&mut self, switch: &str, value: &str) {
        self.append_separator();
        self.buffer.push_str(switch);
        self.append_quoted(value);
    }

    /// Append a file name, quoting it when it contains whitespace.
    pub fn append_file_name(&mut self, file: &str) {
        self.append_separator();
        self.append_quoted(file);
    }

    /// Append a file name when present; an absent file is skipped.
    pub fn append_file_name_if_some(&mut self, file: Option<&str>) {
        if let Some(file) = file {
            self.append_file_name(file);
        }
    }

    /// Append a delimited list of file names as a single unit.
    ///
    /// Individual absent elements are skipped. An absent list or an absent
    /// delimiter aborts the entire append as a no-op; no separator is
    /// emitted in that case.
    pub fn append_file_names(&mut self, files: Option<&[Option<&str>]>, delimiter: Option<&str>) {
        let (Some(files), Some(delimiter)) = (files, delimiter) else {
            return;
        };

        let mut first = true;
        let mut joined = String::new();
        for file in files.iter().filter_map(|f| *f) {
            if !first {
                joined.push_str(delimiter);
            }
            first = false;
            if needs_quoting(file) {
                joined.push('"');
                joined.push_str(file);
                joined.push('"');
            } else {
                joined.push_str(file);
            }
        }

        if !joined.is_empty() {
            self.append_separator();
            self.buffer.push_str(&joined);
        }
    }
}

/// A token is quoted iff it contains ASCII whitespace (space, tab, etc.).
fn needs_quoting(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_whitespace())
}
