//! The end-to-end tool run operation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::StreamExt;
use tempfile::NamedTempFile;
use tokio::sync::mpsc;

use crate::cmdline::CommandLineBuilder;
use crate::config::RunnerConfig;
use crate::process::{
    chunk_stream, spawn_tool, LaunchSpec, RunningTool, SpawnError, StreamSource,
    DEFAULT_CHANNEL_BUFFER,
};

use super::{DiagnosticSink, LineAccumulator, OutputClassifier, ToolInvocation};

/// Error type for tool runs.
///
/// Tool-reported diagnostics are not errors; these cover only failures to
/// get the tool running at all.
#[derive(thiserror::Error, Debug)]
pub enum ToolRunError {
    /// The tool executable could not be resolved.
    #[error("tool executable not found: {0}")]
    ToolNotFound(String),
    /// The OS failed to start the process.
    #[error("failed to launch {tool}: {source}")]
    Launch {
        /// Tool that failed to launch.
        tool: String,
        /// Underlying spawn error.
        source: SpawnError,
    },
    /// The response file could not be written.
    #[error("failed to write response file: {0}")]
    ResponseFile(#[from] std::io::Error),
}

/// Result of one completed tool run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    /// Overall verdict; see [`ToolInvocation::success_when`].
    pub success: bool,
    /// Exit code of the tool.
    pub exit_code: i32,
    /// Error diagnostics emitted, synthesized ones included.
    pub errors: u32,
    /// Warning diagnostics emitted.
    pub warnings: u32,
}

/// Runs external tools and turns their output into diagnostics.
pub struct ToolRunner {
    config: RunnerConfig,
    sink: Arc<dyn DiagnosticSink>,
}

impl ToolRunner {
    /// Create a runner with the given configuration and sink.
    #[must_use]
    pub fn new(config: RunnerConfig, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { config, sink }
    }

    /// Run one tool to completion.
    ///
    /// Resolves the executable, externalizes the response payload if any,
    /// launches the tool, classifies its output line by line, and decides
    /// the overall verdict. A failing run always surfaces at least one
    /// error diagnostic.
    ///
    /// # Errors
    ///
    /// Returns an error when the tool cannot be resolved or launched, or
    /// the response file cannot be written. Non-zero tool exits are not
    /// errors; they are reported through [`RunOutcome`].
    pub async fn run(&self, invocation: &ToolInvocation) -> Result<RunOutcome, ToolRunError> {
        let program = resolve_tool(&invocation.tool)?;
        let tool_name = program
            .file_stem()
            .map_or_else(|| invocation.tool.clone(), |s| s.to_string_lossy().into_owned());

        let mut args = invocation.args.clone();
        let mut response_file = None;
        if let Some(payload) = &invocation.response_payload {
            let file = write_response_file(payload)?;
            args.push(invocation.response_switch(file.path()));
            response_file = Some(file);
        }

        let mut env = self.config.env.to_layers();
        env.extend(invocation.env.iter().cloned());

        let spec = LaunchSpec {
            program,
            args,
            working_dir: invocation.working_dir.clone(),
            env,
            stdin: invocation.stdin.clone(),
            capture_stderr: invocation.capture_stderr,
        };

        let mut display = CommandLineBuilder::new();
        display.append_file_name(&spec.program.to_string_lossy());
        for arg in &spec.args {
            display.append_file_name(arg);
        }
        let display_str = display.as_str();
        tracing::info!(command = %display_str, "launching external tool");

        let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_BUFFER);
        let child = match spawn_tool(&spec) {
            Ok(child) => child,
            Err(source) => {
                tracing::error!(tool = %tool_name, error = %source, "failed to launch tool");
                cleanup_response_file(response_file);
                return Err(ToolRunError::Launch {
                    tool: invocation.tool.clone(),
                    source,
                });
            }
        };
        let running = RunningTool::start(child, tx);

        let mut classifier = OutputClassifier::new(
            tool_name.clone(),
            self.config.streams.stdout,
            self.config.streams.stderr,
            Arc::clone(&self.sink),
        );
        let mut stdout_lines = LineAccumulator::new();
        let mut stderr_lines = LineAccumulator::new();

        let timeout = invocation.timeout.or_else(|| self.config.timeout());
        let mut timed_out = false;

        let chunks = chunk_stream(rx);
        tokio::pin!(chunks);
        let deadline = async {
            match timeout {
                Some(t) => tokio::time::sleep(t).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                chunk = chunks.next() => {
                    let Some(chunk) = chunk else { break };
                    let lines = match chunk.source {
                        StreamSource::Stdout => stdout_lines.push(&chunk.data),
                        StreamSource::Stderr => stderr_lines.push(&chunk.data),
                    };
                    for line in lines {
                        classifier.classify_line(chunk.source, &line);
                    }
                }
                () = &mut deadline, if !timed_out => {
                    timed_out = true;
                    tracing::warn!(tool = %tool_name, ?timeout, "run timed out; terminating tool");
                    running.cancel();
                }
            }
        }

        if let Some(line) = stdout_lines.flush() {
            classifier.classify_line(StreamSource::Stdout, &line);
        }
        if let Some(line) = stderr_lines.flush() {
            classifier.classify_line(StreamSource::Stderr, &line);
        }

        let exit = running.completion().await;
        classifier.finish();

        let success = if timed_out {
            false
        } else if exit.code == 0 {
            true
        } else {
            invocation
                .success_hook
                .as_ref()
                .is_some_and(|hook| hook(exit.code))
        };

        if !success && classifier.errors() == 0 {
            let message = if timed_out {
                format!("{tool_name} timed out and was terminated")
            } else {
                format!("{tool_name} exited with code {}", exit.code)
            };
            classifier.emit_error(&message);
        }

        cleanup_response_file(response_file);

        tracing::info!(
            tool = %tool_name,
            success,
            code = exit.code,
            errors = classifier.errors(),
            warnings = classifier.warnings(),
            "tool run finished"
        );

        Ok(RunOutcome {
            success,
            exit_code: exit.code,
            errors: classifier.errors(),
            warnings: classifier.warnings(),
        })
    }
}

/// Resolve a bare tool name on `PATH`, or verify an explicit path exists.
fn resolve_tool(tool: &str) -> Result<PathBuf, ToolRunError> {
    let path = Path::new(tool);
    let resolved = if path.components().count() > 1 {
        path.exists().then(|| path.to_path_buf())
    } else {
        which::which(tool).ok()
    };
    resolved.ok_or_else(|| {
        tracing::error!(tool, "tool executable not found");
        ToolRunError::ToolNotFound(tool.to_string())
    })
}

/// Write the argument payload to a fresh temporary response file.
fn write_response_file(payload: &str) -> Result<NamedTempFile, std::io::Error> {
    use std::io::Write;

    let mut file = tempfile::Builder::new()
        .prefix("toolrun-")
        .suffix(".rsp")
        .tempfile()?;
    file.write_all(payload.as_bytes())?;
    file.flush()?;
    tracing::debug!(path = %file.path().display(), "wrote response file");
    Ok(file)
}

/// Delete the response file, tolerating failure.
fn cleanup_response_file(file: Option<NamedTempFile>) {
    if let Some(file) = file {
        if let Err(e) = file.close() {
            tracing::warn!(error = %e, "failed to delete response file");
        }
    }
}
