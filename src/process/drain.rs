//! Stream drain pair for a running tool.
//!
//! Each drain is a task that continuously pulls bounded byte chunks from one
//! of the child's standard streams and forwards them over a channel in
//! arrival order. Chunks are raw, not pre-split into lines; line reassembly
//! belongs to the orchestrator. A drain finishes on its own when its stream
//! hits EOF, which is also how cancellation unblocks it: killing the process
//! closes the pipe, the read returns 0, and the loop exits normally.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Bounded size of one read from a child stream.
pub const DRAIN_CHUNK_SIZE: usize = 1024;

/// Default capacity of the chunk channel between drains and orchestrator.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Which standard stream a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamSource {
    /// The child's standard output.
    Stdout,
    /// The child's standard error.
    Stderr,
}

impl std::fmt::Display for StreamSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}

/// One raw chunk of tool output.
#[derive(Debug, Clone)]
pub struct OutputChunk {
    /// Stream the chunk was read from.
    pub source: StreamSource,
    /// Raw bytes, at most [`DRAIN_CHUNK_SIZE`] of them.
    pub data: Vec<u8>,
}

/// Spawn a drain task for one stream.
///
/// The task reads until EOF or a read error. If the receiving side goes away
/// the task keeps reading (and discarding) so the child can never block on a
/// full pipe and the drain still reaches its finished state.
pub fn spawn_drain<R>(
    source: StreamSource,
    mut reader: R,
    tx: mpsc::Sender<OutputChunk>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; DRAIN_CHUNK_SIZE];
        let mut receiver_gone = false;
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    if receiver_gone {
                        continue;
                    }
                    let chunk = OutputChunk {
                        source,
                        data: buf[..n].to_vec(),
                    };
                    if tx.send(chunk).await.is_err() {
                        receiver_gone = true;
                    }
                }
                Err(e) => {
                    tracing::debug!(%source, error = %e, "stream read failed");
                    break;
                }
            }
        }
        tracing::trace!(%source, "drain finished");
    })
}

/// Adapt the chunk channel into a `Stream` for select-friendly consumption.
pub fn chunk_stream(
    rx: mpsc::Receiver<OutputChunk>,
) -> impl futures_core::Stream<Item = OutputChunk> {
    futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    })
}
