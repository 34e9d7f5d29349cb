//! voxfx playback
//!
//! Transport control for the voxfx engine:
//! - Play / pause / stop / relative seek over a decoded buffer
//! - Offset accounting across pause, seek and rate changes
//! - Periodic progress reporting through a cancellable background task
//! - Exactly one live playback unit while playing, none otherwise
//!
//! # Architecture
//!
//! The transport owns position, rate and the live [`PlaybackUnit`]. It never
//! talks to observers directly; instead it queues [`TransportEvent`]s that
//! the engine drains after every operation. Time comes from a [`Clock`], so
//! the same controller runs against tokio time in the engine and against a
//! [`ManualClock`] in tests and offline renders.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use voxfx_audio::AudioBuffer;
//! use voxfx_playback::{ManualClock, ProgressReporter, TransportController, TransportState};
//!
//! let clock = ManualClock::new();
//! let mut transport = TransportController::new(
//!     Arc::new(clock.clone()),
//!     ProgressReporter::detached(Duration::from_millis(100)),
//! );
//! transport.load(Arc::new(AudioBuffer::silence(10.0, 8000).unwrap())).unwrap();
//!
//! transport.play().unwrap();
//! clock.advance(Duration::from_secs(3));
//! transport.pause();
//!
//! assert_eq!(transport.state(), TransportState::Paused);
//! assert!((transport.start_offset() - 3.0).abs() < 1e-9);
//! ```

#![forbid(unsafe_code)]

mod clock;
mod error;
mod events;
mod progress;
mod render;
mod transport;
mod types;
mod unit;

pub use clock::{Clock, ManualClock, TokioClock};
pub use error::{PlaybackError, Result};
pub use events::TransportEvent;
pub use progress::{ProgressReporter, ProgressTick};
pub use render::{render_block, BlockRenderer};
pub use transport::TransportController;
pub use types::{TransportConfig, TransportState};
pub use unit::{PlaybackUnit, UnitId};
