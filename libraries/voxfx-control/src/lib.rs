//! voxfx control
//!
//! Everything between a command and the audio engine:
//! - [`ParameterRouter`]: catalog-checked entry point for numeric input
//! - [`CommandDispatcher`]: validates commands from the UI or the remote
//!   channel and applies them through the router and transport
//! - [`StateObserver`]: how front ends hear about progress, parameter and
//!   transport changes
//! - [`Engine`]: the single task that owns the graph and transport, fed by a
//!   bounded queue
//! - [`RemoteSession`]: line-delimited JSON commands from any async reader
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use voxfx_audio::{EffectGraph, GraphConfig};
//! use voxfx_control::{Command, CommandDispatcher, ParameterRouter, RecordingObserver};
//! use voxfx_core::ParameterCatalog;
//! use voxfx_playback::{ManualClock, ProgressReporter, TransportController};
//!
//! let catalog = Arc::new(ParameterCatalog::bundled().unwrap());
//! let config = GraphConfig { sample_rate: 8000, max_delay_seconds: 1.0, impulse_seconds: 0.1 };
//! let mut graph = EffectGraph::build(Arc::clone(&catalog), config).unwrap();
//! let mut transport = TransportController::new(
//!     Arc::new(ManualClock::new()),
//!     ProgressReporter::detached(Duration::from_millis(100)),
//! );
//! let dispatcher = CommandDispatcher::new(ParameterRouter::new(catalog));
//! let mut observer = RecordingObserver::new();
//!
//! let message = dispatcher
//!     .dispatch(
//!         &Command::set_effect_parameter("reverb", "mix", 0.5),
//!         &mut graph,
//!         &mut transport,
//!         &mut observer,
//!     )
//!     .unwrap();
//! assert_eq!(message, "Set reverb mix to 50%");
//! ```

#![forbid(unsafe_code)]

pub mod command;
mod dispatcher;
mod engine;
mod error;
mod observer;
mod remote;
pub mod router;

pub use command::{
    command_schema, Command, CommandResponse, Operation, PlaybackAction, SeekDirection, Surface,
};
pub use dispatcher::{forward_transport_events, CommandDispatcher};
pub use engine::{Engine, EngineConfig, EngineHandle, EngineInput, EngineStatus};
pub use error::{ControlError, Result};
pub use observer::{ChannelObserver, ControlEvent, LogObserver, RecordingObserver, StateObserver};
pub use remote::{RemoteSession, SessionEnd, SessionSummary};
pub use router::{ParameterEcho, ParameterRouter};
