//! Tool process launching.
//!
//! Builds a [`tokio::process::Command`] from a [`LaunchSpec`] with redirected
//! standard streams and layered environment overrides, and spawns the child.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};

/// Error type for process spawning operations.
#[derive(thiserror::Error, Debug)]
pub enum SpawnError {
    /// The tool binary was not found.
    #[error("tool binary not found")]
    NotFound,
    /// Permission denied when spawning.
    #[error("permission denied")]
    PermissionDenied,
    /// Other I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SpawnError {
    /// Create a `SpawnError` from an I/O error, classifying common cases.
    fn from_io(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound,
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::Io(err),
        }
    }
}

/// Fully resolved description of one tool launch.
///
/// Environment overrides are applied in order over the inherited environment;
/// a `None` value removes the variable. Entries later in the list win, so the
/// caller places per-call overrides after config-wide ones.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    /// Resolved path of the executable.
    pub program: PathBuf,
    /// Arguments passed to the tool, response-file switch included.
    pub args: Vec<String>,
    /// Working directory for the child, if different from the parent's.
    pub working_dir: Option<PathBuf>,
    /// Layered environment overrides.
    pub env: Vec<(String, Option<String>)>,
    /// Payload written to the child's stdin, which is then closed. Without a
    /// payload the child gets a null stdin so it can never block on a read.
    pub stdin: Option<String>,
    /// Whether stderr is captured; when false it is discarded at the OS level.
    pub capture_stderr: bool,
}

impl LaunchSpec {
    /// Create a spec for the given executable with empty arguments.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: Vec::new(),
            stdin: None,
            capture_stderr: true,
        }
    }
}

/// Spawn the tool described by `spec` with piped standard streams.
///
/// Must be called from within a tokio runtime: when a stdin payload is
/// present, a detached task writes it and closes the pipe.
///
/// # Errors
///
/// Returns `SpawnError` if the OS fails to start the process.
pub fn spawn_tool(spec: &LaunchSpec) -> Result<Child, SpawnError> {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .stdout(Stdio::piped())
        .stderr(if spec.capture_stderr {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdin(if spec.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

    if let Some(ref dir) = spec.working_dir {
        cmd.current_dir(dir);
    }

    for (name, value) in &spec.env {
        match value {
            Some(value) => {
                cmd.env(name, value);
            }
            None => {
                cmd.env_remove(name);
            }
        }
    }

    let mut child = cmd.spawn().map_err(SpawnError::from_io)?;

    if let Some(payload) = spec.stdin.clone() {
        if let Some(mut stdin) = child.stdin.take() {
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(payload.as_bytes()).await {
                    tracing::debug!(error = %e, "failed to write tool stdin payload");
                }
                // Dropping the handle closes the pipe so the tool sees EOF.
            });
        }
    }

    tracing::debug!(
        program = %spec.program.display(),
        args = ?spec.args,
        pid = ?child.id(),
        "spawned tool process"
    );

    Ok(child)
}
