//! Single-task engine runtime
//!
//! The engine owns the graph, transport and dispatcher and is the only place
//! they are mutated. Commands, decode completions and progress ticks all
//! arrive over channels and are handled one at a time, in arrival order.
//! With an [`AudioSink`] attached, the engine also renders one block per
//! block period through the graph and hands it to the sink.
//!
//! ```text
//!  EngineHandle ──┐  bounded queue
//!  RemoteSession ─┼──────────────► Engine::run ──► StateObserver
//!  decode task ───┘                   ▲   │
//!                 progress ticks ─────┘   └──► AudioSink
//! ```

use crate::command::{Command, CommandResponse};
use crate::dispatcher::{forward_transport_events, CommandDispatcher};
use crate::error::{ControlError, Result};
use crate::observer::StateObserver;
use crate::router::ParameterRouter;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{info, warn};
use voxfx_audio::{
    AudioBuffer, AudioError, AudioSink, EffectGraph, GraphConfig, SymphoniaDecoder, CHANNELS,
};
use voxfx_core::ParameterCatalog;
use voxfx_playback::{
    render_block, ProgressReporter, ProgressTick, TokioClock, TransportController,
    TransportState,
};

/// Progress ticks buffered between the reporter task and the engine
const TICK_QUEUE_CAPACITY: usize = 16;

/// Engine construction parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub graph: GraphConfig,
    pub progress_interval: Duration,
    pub queue_capacity: usize,
    /// Frames per block handed to an attached sink
    pub block_frames: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            graph: GraphConfig::default(),
            progress_interval: Duration::from_millis(100),
            queue_capacity: 64,
            block_frames: 1024,
        }
    }
}

impl EngineConfig {
    /// Wall time one block covers
    pub fn block_period(&self) -> Duration {
        Duration::from_secs_f64(self.block_frames as f64 / f64::from(self.graph.sample_rate))
    }
}

/// Snapshot of the transport for front ends
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub state: TransportState,
    pub position_secs: f64,
    pub duration_secs: Option<f64>,
    pub playback_rate: f64,
    pub progress: f64,
}

/// Messages accepted by the engine task
pub enum EngineInput {
    Command {
        command: Command,
        reply: oneshot::Sender<CommandResponse>,
    },
    AudioLoaded {
        result: std::result::Result<AudioBuffer, AudioError>,
        reply: oneshot::Sender<Result<f64>>,
    },
    Status {
        reply: oneshot::Sender<EngineStatus>,
    },
    Shutdown,
}

/// The engine task's state
pub struct Engine {
    graph: EffectGraph,
    transport: TransportController,
    dispatcher: CommandDispatcher,
    observer: Box<dyn StateObserver>,
    inputs: mpsc::Receiver<EngineInput>,
    ticks: mpsc::Receiver<ProgressTick>,
    sink: Option<Box<dyn AudioSink>>,
    block: Vec<f32>,
    block_period: Duration,
}

impl Engine {
    /// Build the graph, apply catalog defaults, and return the engine with
    /// a handle to its queue
    ///
    /// Must be called inside a tokio runtime; the progress reporter spawns
    /// onto it.
    pub fn new(
        catalog: Arc<ParameterCatalog>,
        config: EngineConfig,
        mut observer: Box<dyn StateObserver>,
    ) -> Result<(Self, EngineHandle)> {
        if config.queue_capacity == 0 {
            return Err(ControlError::invalid_command("command queue capacity is zero"));
        }
        if config.block_frames == 0 {
            return Err(ControlError::invalid_command("block size is zero"));
        }

        let mut graph = EffectGraph::build(Arc::clone(&catalog), config.graph)?;
        let (tick_tx, ticks) = mpsc::channel(TICK_QUEUE_CAPACITY);
        let mut transport = TransportController::new(
            Arc::new(TokioClock::new()),
            ProgressReporter::with_sink(config.progress_interval, tick_tx),
        );

        let dispatcher = CommandDispatcher::new(ParameterRouter::new(catalog));
        let applied = dispatcher.reset_effects(&mut graph, &mut transport, observer.as_mut())?;
        forward_transport_events(&mut transport, observer.as_mut());
        info!("Engine ready with {} catalog defaults applied", applied);

        let (tx, inputs) = mpsc::channel(config.queue_capacity);
        let engine = Self {
            graph,
            transport,
            dispatcher,
            observer,
            inputs,
            ticks,
            sink: None,
            block: vec![0.0; config.block_frames * CHANNELS],
            block_period: config.block_period(),
        };
        let handle = EngineHandle {
            tx,
            sample_rate: config.graph.sample_rate,
        };
        Ok((engine, handle))
    }

    /// Send every rendered block to `sink`
    ///
    /// Blocks are rendered whatever the transport state, so reverb and
    /// delay tails ring out after a pause or stop.
    pub fn with_sink(mut self, sink: Box<dyn AudioSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Process inputs until shutdown or until every handle is dropped
    pub async fn run(mut self) {
        info!("Engine started");
        let mut blocks = self.sink.is_some().then(|| {
            let mut timer = tokio::time::interval(self.block_period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Burst);
            timer
        });
        loop {
            tokio::select! {
                Some(_) = next_block(&mut blocks) => {
                    if !self.render_to_sink() {
                        blocks = None;
                    }
                }
                Some(tick) = self.ticks.recv() => {
                    self.transport.on_progress_tick(tick);
                    forward_transport_events(&mut self.transport, self.observer.as_mut());
                }
                input = self.inputs.recv() => match input {
                    Some(EngineInput::Command { command, reply }) => {
                        let response = self.dispatcher.respond(
                            &command,
                            &mut self.graph,
                            &mut self.transport,
                            self.observer.as_mut(),
                        );
                        // The caller may have stopped waiting
                        let _ = reply.send(response);
                    }
                    Some(EngineInput::AudioLoaded { result, reply }) => {
                        let _ = reply.send(self.install_audio(result));
                    }
                    Some(EngineInput::Status { reply }) => {
                        let _ = reply.send(self.status());
                    }
                    Some(EngineInput::Shutdown) | None => break,
                },
            }
        }

        self.transport.stop();
        forward_transport_events(&mut self.transport, self.observer.as_mut());
        if let Some(mut sink) = self.sink.take() {
            if let Err(e) = sink.finish() {
                warn!("Audio sink failed to close: {}", e);
            }
        }
        info!("Engine stopped");
    }

    /// Render one block into the sink; false once the sink is gone
    fn render_to_sink(&mut self) -> bool {
        let Some(sink) = self.sink.as_mut() else {
            return false;
        };
        // A unit running dry here stops the transport as end of media
        render_block(&mut self.transport, &mut self.graph, &mut self.block);
        let written = sink.write(&self.block);
        forward_transport_events(&mut self.transport, self.observer.as_mut());

        match written {
            Ok(()) => true,
            Err(e) => {
                warn!("Audio sink failed, rendering stopped: {}", e);
                self.sink = None;
                false
            }
        }
    }

    fn install_audio(&mut self, result: std::result::Result<AudioBuffer, AudioError>) -> Result<f64> {
        let buffer = result.map_err(|e| {
            warn!("Audio load failed, keeping current state: {}", e);
            ControlError::from(e)
        })?;
        let duration = buffer.duration_secs();
        self.transport.load(Arc::new(buffer))?;
        self.graph.reset();
        forward_transport_events(&mut self.transport, self.observer.as_mut());
        Ok(duration)
    }

    fn status(&self) -> EngineStatus {
        EngineStatus {
            state: self.transport.state(),
            position_secs: self.transport.position(),
            duration_secs: self.transport.duration(),
            playback_rate: self.transport.playback_rate(),
            progress: self.transport.progress_percentage(),
        }
    }
}

/// Next block deadline, or pending forever without a sink
async fn next_block(blocks: &mut Option<Interval>) -> Option<tokio::time::Instant> {
    match blocks {
        Some(timer) => Some(timer.tick().await),
        None => std::future::pending().await,
    }
}

/// Cloneable sender side of the engine queue
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineInput>,
    sample_rate: u32,
}

impl EngineHandle {
    /// Queue a command and wait for its response
    pub async fn dispatch(&self, command: Command) -> Result<CommandResponse> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineInput::Command { command, reply }).await?;
        rx.await.map_err(|_| ControlError::QueueClosed)
    }

    /// Decode `path` off the engine task, then hand the buffer to the engine
    ///
    /// Returns the new duration in seconds. A decode failure leaves the
    /// transport as it was.
    pub async fn load_audio(&self, path: PathBuf) -> Result<f64> {
        let rate = self.sample_rate;
        let result = tokio::task::spawn_blocking(move || {
            SymphoniaDecoder::new().decode_to_rate(&path, rate)
        })
        .await
        .unwrap_or_else(|e| Err(AudioError::DecodeError(e.to_string())));
        self.deliver(result).await
    }

    /// Hand an already decoded buffer to the engine
    pub async fn load_buffer(&self, buffer: AudioBuffer) -> Result<f64> {
        self.deliver(Ok(buffer)).await
    }

    pub async fn status(&self) -> Result<EngineStatus> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineInput::Status { reply }).await?;
        rx.await.map_err(|_| ControlError::QueueClosed)
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(EngineInput::Shutdown).await
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    async fn deliver(&self, result: std::result::Result<AudioBuffer, AudioError>) -> Result<f64> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineInput::AudioLoaded { result, reply }).await?;
        rx.await.map_err(|_| ControlError::QueueClosed)?
    }

    async fn send(&self, input: EngineInput) -> Result<()> {
        self.tx
            .send(input)
            .await
            .map_err(|_| ControlError::QueueClosed)
    }
}
