//! Process supervision: run a tool to completion while draining its streams.
//!
//! The supervise task enforces the completion ordering invariant: the exit
//! code becomes observable only after the stdout drain has finished, then the
//! stderr drain, then the OS process has been reaped. A child may close its
//! descriptors before truly terminating, or keep a grandchild alive that
//! holds the pipes open after it exits; the double condition covers both.

use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{spawn_drain, OutputChunk, StreamSource};

/// Grace period between a termination request and a forced kill.
pub const TERMINATE_GRACE: Duration = Duration::from_secs(5);

/// Exit information published exactly once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitInfo {
    /// Exit code of the tool. On Unix a signal death is reported
    /// shell-style as `128 + signal`.
    pub code: i32,
}

impl ExitInfo {
    /// True when the tool exited with code 0.
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Fallback when the supervise task cannot produce a real status.
const EXIT_UNKNOWN: ExitInfo = ExitInfo { code: -1 };

/// A tool process being supervised.
///
/// Owns a cancellation token and a single-fire completion notification. The
/// child itself lives inside the supervise task; callers interact with it
/// only through cancellation and the completion watch.
#[derive(Debug)]
pub struct RunningTool {
    cancel: CancellationToken,
    completion: watch::Receiver<Option<ExitInfo>>,
}

impl RunningTool {
    /// Start supervising a spawned child.
    ///
    /// Takes whatever piped streams the child has and spawns one drain task
    /// per stream, forwarding chunks over `tx`. A stream that was not piped
    /// (stderr capture disabled) counts as immediately finished.
    #[must_use]
    pub fn start(mut child: Child, tx: mpsc::Sender<OutputChunk>) -> Self {
        let out_task = child
            .stdout
            .take()
            .map(|stream| spawn_drain(StreamSource::Stdout, stream, tx.clone()));
        let err_task = child
            .stderr
            .take()
            .map(|stream| spawn_drain(StreamSource::Stderr, stream, tx.clone()));
        drop(tx);

        let cancel = CancellationToken::new();
        let (done_tx, done_rx) = watch::channel(None);
        tokio::spawn(supervise(child, out_task, err_task, cancel.clone(), done_tx));

        Self {
            cancel,
            completion: done_rx,
        }
    }

    /// Request termination of the tool.
    ///
    /// Idempotent and safe from any task, including concurrently with an
    /// in-flight [`completion`](Self::completion) wait or after the process
    /// already exited. The drains are never aborted; the dying process closes
    /// its pipes and the drains finish on EOF.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token cancelled together with [`cancel`](Self::cancel); lets callers
    /// tie the run into a wider shutdown tree.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Non-blocking view of the exit information.
    ///
    /// `None` until both drains have finished and the process has been
    /// reaped, regardless of how long ago the child itself exited.
    #[must_use]
    pub fn try_exit(&self) -> Option<ExitInfo> {
        *self.completion.borrow()
    }

    /// Wait for the run to complete.
    ///
    /// May be awaited by any number of consumers, before or after the fact;
    /// if the process already finished this resolves immediately.
    pub async fn completion(&self) -> ExitInfo {
        let mut rx = self.completion.clone();
        let exit = match rx.wait_for(Option::is_some).await {
            Ok(info) => (*info).unwrap_or(EXIT_UNKNOWN),
            Err(_) => {
                tracing::error!("supervise task dropped without publishing an exit");
                EXIT_UNKNOWN
            }
        };
        exit
    }
}

/// The supervise task: join drains, then reap, then publish.
async fn supervise(
    mut child: Child,
    out_task: Option<JoinHandle<()>>,
    err_task: Option<JoinHandle<()>>,
    cancel: CancellationToken,
    done: watch::Sender<Option<ExitInfo>>,
) {
    let drains = async move {
        if let Some(task) = out_task {
            let _ = task.await;
        }
        if let Some(task) = err_task {
            let _ = task.await;
        }
    };
    tokio::pin!(drains);

    tokio::select! {
        () = &mut drains => {}
        () = cancel.cancelled() => {
            terminate(&mut child).await;
            drains.await;
        }
    }

    // Both drains are finished; now reap the process itself.
    let reaped = tokio::select! {
        status = child.wait() => Some(status),
        () = cancel.cancelled() => None,
    };
    let status = match reaped {
        Some(status) => status,
        None => {
            terminate(&mut child).await;
            child.wait().await
        }
    };

    let info = match status {
        Ok(status) => ExitInfo {
            code: exit_code(status),
        },
        Err(e) => {
            tracing::error!(error = %e, "failed to reap tool process");
            EXIT_UNKNOWN
        }
    };
    tracing::debug!(code = info.code, "tool run complete");
    let _ = done.send(Some(info));
}

/// Ask the process to terminate, escalating to a forced kill.
///
/// On Unix sends SIGTERM first and SIGKILLs after [`TERMINATE_GRACE`];
/// elsewhere kills immediately. Failures are tolerated: the process may
/// already be gone.
async fn terminate(child: &mut Child) {
    signal_terminate(child);
    match tokio::time::timeout(TERMINATE_GRACE, child.wait()).await {
        Ok(_) => {}
        Err(_) => {
            let _ = child.start_kill();
        }
    }
}

#[cfg(unix)]
fn signal_terminate(child: &mut Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = child.id() {
        let nix_pid = Pid::from_raw(i32::try_from(pid).unwrap_or(i32::MAX));
        let _ = kill(nix_pid, Signal::SIGTERM);
    }
}

#[cfg(not(unix))]
fn signal_terminate(child: &mut Child) {
    let _ = child.start_kill();
}

/// Map an [`ExitStatus`] to a concrete integer code.
fn exit_code(status: ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        status
            .code()
            .or_else(|| status.signal().map(|s| 128 + s))
            .unwrap_or(-1)
    }
    #[cfg(not(unix))]
    {
        status.code().unwrap_or(-1)
    }
}
