//! Remote command session
//!
//! Reads line-delimited JSON commands from any async reader, feeds them into
//! the engine queue tagged as remote, and writes one JSON response line per
//! command. Engine events can be interleaved into the same output.
//!
//! Stopping a session ends its reader task and drops its channels. The
//! engine and its transport are untouched.

use crate::command::{Command, CommandResponse, Surface};
use crate::engine::EngineHandle;
use crate::error::ControlError;
use crate::observer::ControlEvent;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The input reached end of stream
    InputClosed,
    /// [`RemoteSession::stop`] was called
    Cancelled,
    /// The engine went away
    EngineClosed,
    /// Reading or writing failed
    IoError,
}

/// Commands and responses counted over a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub end: SessionEnd,
    pub commands: usize,
    pub failures: usize,
}

/// A running remote session
pub struct RemoteSession {
    cancel: CancellationToken,
    task: JoinHandle<SessionSummary>,
}

impl RemoteSession {
    /// Start reading commands from `reader`, writing responses to `writer`
    ///
    /// When `events` is given, engine events are written to `writer` as
    /// well, one JSON object per line.
    pub fn spawn<R, W>(
        reader: R,
        writer: W,
        engine: EngineHandle,
        events: Option<mpsc::UnboundedReceiver<ControlEvent>>,
    ) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let worker = SessionWorker {
            engine,
            writer,
            events,
            summary: SessionSummary {
                end: SessionEnd::InputClosed,
                commands: 0,
                failures: 0,
            },
        };
        let task = tokio::spawn(worker.run(BufReader::new(reader), cancel.clone()));
        info!("Remote session started");
        Self { cancel, task }
    }

    /// Cancel the session and wait for its task to release everything
    pub async fn stop(self) -> SessionSummary {
        self.cancel.cancel();
        self.join().await
    }

    /// Wait for the session to end on its own
    pub async fn join(self) -> SessionSummary {
        match self.task.await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Remote session task failed: {}", e);
                SessionSummary {
                    end: SessionEnd::IoError,
                    commands: 0,
                    failures: 0,
                }
            }
        }
    }

    /// Token that stops the session when cancelled, usable from elsewhere
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

struct SessionWorker<W> {
    engine: EngineHandle,
    writer: W,
    events: Option<mpsc::UnboundedReceiver<ControlEvent>>,
    summary: SessionSummary,
}

impl<W: AsyncWrite + Unpin> SessionWorker<W> {
    async fn run<R>(mut self, reader: BufReader<R>, cancel: CancellationToken) -> SessionSummary
    where
        R: AsyncRead + Unpin,
    {
        let mut lines = reader.lines();
        let end = loop {
            tokio::select! {
                () = cancel.cancelled() => break SessionEnd::Cancelled,
                Some(event) = next_event(&mut self.events) => {
                    if self.write_line(&event).await.is_err() {
                        break SessionEnd::IoError;
                    }
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        if let Some(end) = self.handle_line(&line).await {
                            break end;
                        }
                    }
                    Ok(None) => break SessionEnd::InputClosed,
                    Err(e) => {
                        warn!("Remote input failed: {}", e);
                        break SessionEnd::IoError;
                    }
                },
            }
        };

        self.summary.end = end;
        info!(
            "Remote session ended ({:?}) after {} commands, {} failed",
            end, self.summary.commands, self.summary.failures
        );
        self.summary
    }

    /// Returns the reason to stop, if any
    async fn handle_line(&mut self, line: &str) -> Option<SessionEnd> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        self.summary.commands += 1;

        let response = match serde_json::from_str::<Command>(line) {
            Ok(command) => {
                debug!("Remote command: {}", command.name);
                match self.engine.dispatch(command.with_surface(Surface::Remote)).await {
                    Ok(response) => response,
                    Err(ControlError::QueueClosed) => return Some(SessionEnd::EngineClosed),
                    Err(e) => CommandResponse::failed(e.to_string()),
                }
            }
            Err(e) => CommandResponse::failed(format!("Malformed command: {e}")),
        };

        if !response.success {
            self.summary.failures += 1;
        }
        match self.write_line(&response).await {
            Ok(()) => None,
            Err(_) => Some(SessionEnd::IoError),
        }
    }

    async fn write_line<T: Serialize>(&mut self, value: &T) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(value)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        self.writer.flush().await
    }
}

/// Next engine event, or pending forever when events are not forwarded
async fn next_event(events: &mut Option<mpsc::UnboundedReceiver<ControlEvent>>) -> Option<ControlEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
