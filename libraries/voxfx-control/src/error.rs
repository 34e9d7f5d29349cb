//! Error types for routing and dispatch

use thiserror::Error;
use voxfx_audio::AudioError;
use voxfx_playback::PlaybackError;

/// Control-layer errors
///
/// Every variant is a local rejection: nothing was mutated and no observer
/// was notified.
#[derive(Debug, Error)]
pub enum ControlError {
    /// No catalog descriptor for this (effect, parameter) pair
    #[error("Unknown parameter: {effect}.{parameter}")]
    UnknownParameter { effect: String, parameter: String },

    /// Unknown operation name or missing/malformed arguments
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// Playback property outside its descriptor's range
    #[error("Invalid value {value} for {effect}.{parameter}: expected [{min}, {max}]")]
    InvalidParameter {
        effect: String,
        parameter: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Effect graph rejection or decode failure
    #[error(transparent)]
    Audio(#[from] AudioError),

    /// Transport rejection, e.g. no audio loaded
    #[error(transparent)]
    Playback(#[from] PlaybackError),

    /// The engine task is gone
    #[error("Engine queue closed")]
    QueueClosed,
}

impl ControlError {
    pub(crate) fn unknown_parameter(effect: &str, parameter: &str) -> Self {
        Self::UnknownParameter {
            effect: effect.to_string(),
            parameter: parameter.to_string(),
        }
    }

    pub(crate) fn invalid_command(msg: impl Into<String>) -> Self {
        Self::InvalidCommand(msg.into())
    }

    /// Whether the rejection came from missing decoded audio
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::Playback(PlaybackError::NotReady))
    }
}

/// Result type for control operations
pub type Result<T> = std::result::Result<T, ControlError>;
