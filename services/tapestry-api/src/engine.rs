//! The engine channel.
//!
//! One long-lived engine process serves every render. Requests go to its
//! stdin, responses come back on its stdout, strictly one response per
//! request and in order. The channel is single-flight: [`EngineChannel::render`]
//! takes `&mut self`, and callers share it behind a mutex so a request and
//! its response are never interleaved with another caller's.
//!
//! The channel is fail-stop. Once the process exits, a write fails, or a
//! response frame comes back short, the stream position is unknown and the
//! channel refuses all further renders until the service is restarted.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tapestry_common::{RenderingRequest, RenderingResponse};
use tapestry_protocol::{read_response, write_request, ProtocolError};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, BufReader, BufWriter};
use tokio::process::{Child, Command};
use tracing::{debug, error, info};

/// Errors raised by the engine channel. All of them are fatal for the
/// current render.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to launch engine '{}': {source}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("engine process has exited")]
    ProcessExited,

    #[error("failed to send request to engine: {0}")]
    Write(#[source] io::Error),

    #[error("engine response framing error: {0}")]
    Framing(#[from] ProtocolError),
}

/// Shared flag that flips to dead exactly once and never back.
#[derive(Debug, Clone)]
pub struct EngineLiveness(Arc<AtomicBool>);

impl EngineLiveness {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Mark the engine dead. Returns true if it was alive before.
    pub fn mark_dead(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

type EngineStdin = BufWriter<Box<dyn AsyncWrite + Send + Unpin>>;
type EngineStdout = BufReader<Box<dyn AsyncRead + Send + Unpin>>;

pub struct EngineChannel {
    stdin: EngineStdin,
    stdout: EngineStdout,
    liveness: EngineLiveness,
    renders: u64,
}

impl std::fmt::Debug for EngineChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineChannel")
            .field("alive", &self.liveness.is_alive())
            .field("renders", &self.renders)
            .finish()
    }
}

impl EngineChannel {
    /// Launch the engine (no arguments) and start watching for its exit.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(executable: &Path) -> Result<Self, EngineError> {
        let spawn_error = |source| EngineError::Spawn {
            path: executable.to_path_buf(),
            source,
        };

        let mut child = Command::new(executable)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_error)?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| spawn_error(io::Error::other("engine stdin was not captured")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| spawn_error(io::Error::other("engine stdout was not captured")))?;

        info!(
            pid = child.id(),
            executable = %executable.display(),
            "Engine process started"
        );

        let channel = Self::from_pipes(stdin, stdout);
        tokio::spawn(watch_engine(child, channel.liveness()));
        Ok(channel)
    }

    /// Build a channel over existing pipes. No process is watched; the
    /// channel dies only on I/O or framing failures.
    pub fn from_pipes<W, R>(stdin: W, stdout: R) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self {
            stdin: BufWriter::new(Box::new(stdin)),
            stdout: BufReader::new(Box::new(stdout)),
            liveness: EngineLiveness::new(),
            renders: 0,
        }
    }

    pub fn liveness(&self) -> EngineLiveness {
        self.liveness.clone()
    }

    pub fn is_alive(&self) -> bool {
        self.liveness.is_alive()
    }

    /// Number of completed round-trips.
    pub fn renders(&self) -> u64 {
        self.renders
    }

    /// Send one request and wait for its response.
    ///
    /// Not cancellation safe: dropping this future between the write and
    /// the end of the read leaves the stream mid-frame. Callers that may
    /// be cancelled must run it on a task of its own.
    pub async fn render(
        &mut self,
        request: &RenderingRequest,
    ) -> Result<RenderingResponse, EngineError> {
        if !self.liveness.is_alive() {
            return Err(EngineError::ProcessExited);
        }

        if let Err(e) = write_request(&mut self.stdin, request).await {
            self.fail(&e);
            return Err(EngineError::Write(e));
        }

        match read_response(&mut self.stdout).await {
            Ok(response) => {
                self.renders += 1;
                debug!(
                    renders = self.renders,
                    image_length = response.image_length(),
                    "Engine round-trip complete"
                );
                Ok(response)
            }
            Err(e) => {
                self.fail(&e);
                Err(EngineError::Framing(e))
            }
        }
    }

    fn fail(&self, cause: &dyn std::error::Error) {
        if self.liveness.mark_dead() {
            error!(
                error = %cause,
                renders = self.renders,
                "Engine channel failed; refusing further renders until restart"
            );
        }
    }
}

/// Wait for the engine to exit and mark the channel dead. No restart:
/// a new process would start reading mid-conversation.
async fn watch_engine(mut child: Child, liveness: EngineLiveness) {
    let status = child.wait().await;
    liveness.mark_dead();
    metrics::gauge!("tapestry_engine_alive").set(0.0);

    match status {
        Ok(status) => error!(%status, "Engine process exited; restart the service to recover"),
        Err(e) => error!(error = %e, "Failed to wait on engine process"),
    }
}
