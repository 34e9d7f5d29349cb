//! Error types for transport control

use thiserror::Error;

/// Transport errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Operation needs decoded audio and none is loaded
    #[error("No audio loaded")]
    NotReady,

    /// Loaded audio has no frames
    #[error("Audio buffer is empty")]
    EmptyAudio,

    /// Seek delta is not a finite number
    #[error("Invalid seek delta: {0}")]
    InvalidSeek(f64),

    /// Playback rate must be finite and positive
    #[error("Invalid playback rate: {0}")]
    InvalidRate(f64),
}

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
