//! Invocation requests for external tools.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Formats the command-line switch that references a response file.
pub type ResponseSwitchFormat = Arc<dyn Fn(&Path) -> String + Send + Sync>;

/// Decides run success from a non-zero exit code.
pub type SuccessHook = Arc<dyn Fn(i32) -> bool + Send + Sync>;

/// Everything needed to run one external tool.
///
/// Built once per run and not mutated afterwards. Environment overrides are
/// per-call; the runner layers them over the config-wide table, which in
/// turn layers over the inherited environment. A `None` value unsets the
/// variable.
#[derive(Clone)]
pub struct ToolInvocation {
    pub(crate) tool: String,
    pub(crate) args: Vec<String>,
    pub(crate) response_payload: Option<String>,
    pub(crate) response_switch_format: Option<ResponseSwitchFormat>,
    pub(crate) working_dir: Option<PathBuf>,
    pub(crate) env: Vec<(String, Option<String>)>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) stdin: Option<String>,
    pub(crate) capture_stderr: bool,
    pub(crate) success_hook: Option<SuccessHook>,
}

impl ToolInvocation {
    /// Create an invocation for the given tool (bare name or path).
    #[must_use]
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            args: Vec::new(),
            response_payload: None,
            response_switch_format: None,
            working_dir: None,
            env: Vec::new(),
            timeout: None,
            stdin: None,
            capture_stderr: true,
            success_hook: None,
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Externalize an argument payload to a temporary response file.
    ///
    /// The payload is written verbatim (UTF-8) and referenced on the real
    /// command line by the switch produced by
    /// [`response_switch_format`](Self::response_switch_format).
    #[must_use]
    pub fn response_payload(mut self, payload: impl Into<String>) -> Self {
        self.response_payload = Some(payload.into());
        self
    }

    /// Override how the response-file switch is derived (default `@<path>`).
    #[must_use]
    pub fn response_switch_format<F>(mut self, format: F) -> Self
    where
        F: Fn(&Path) -> String + Send + Sync + 'static,
    {
        self.response_switch_format = Some(Arc::new(format));
        self
    }

    /// Set the working directory for the tool.
    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Set an environment variable for this run.
    #[must_use]
    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((name.into(), Some(value.into())));
        self
    }

    /// Unset an environment variable the tool would otherwise inherit.
    #[must_use]
    pub fn env_remove(mut self, name: impl Into<String>) -> Self {
        self.env.push((name.into(), None));
        self
    }

    /// Bound the whole run; expiry terminates the tool and fails the run.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Redirect standard input and feed it this payload.
    #[must_use]
    pub fn stdin(mut self, payload: impl Into<String>) -> Self {
        self.stdin = Some(payload.into());
        self
    }

    /// Whether stderr is captured and classified (default true). When
    /// disabled, the stderr drain counts as immediately finished.
    #[must_use]
    pub fn capture_stderr(mut self, capture: bool) -> Self {
        self.capture_stderr = capture;
        self
    }

    /// Override the success verdict for non-zero exit codes.
    ///
    /// The hook is consulted only when the exit code is non-zero; code 0
    /// always succeeds.
    #[must_use]
    pub fn success_when<F>(mut self, hook: F) -> Self
    where
        F: Fn(i32) -> bool + Send + Sync + 'static,
    {
        self.success_hook = Some(Arc::new(hook));
        self
    }

    /// The tool name or path this invocation targets.
    #[must_use]
    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Derive the response-file switch for a concrete path.
    pub(crate) fn response_switch(&self, path: &Path) -> String {
        match &self.response_switch_format {
            Some(format) => format(path),
            None => format!("@{}", path.display()),
        }
    }
}

impl std::fmt::Debug for ToolInvocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolInvocation")
            .field("tool", &self.tool)
            .field("args", &self.args)
            .field("response_payload", &self.response_payload)
            .field("working_dir", &self.working_dir)
            .field("env", &self.env)
            .field("timeout", &self.timeout)
            .field("stdin", &self.stdin)
            .field("capture_stderr", &self.capture_stderr)
            .finish_non_exhaustive()
    }
}
