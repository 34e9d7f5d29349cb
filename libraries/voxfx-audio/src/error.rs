/// Audio-specific errors
use thiserror::Error;

/// Result type alias using `AudioError`
pub type Result<T> = std::result::Result<T, AudioError>;

/// Audio error types
#[derive(Error, Debug)]
pub enum AudioError {
    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Decoding error
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// Invalid audio buffer
    #[error("Invalid audio buffer: {0}")]
    InvalidBuffer(String),

    /// Resampler construction or processing failed
    #[error("Resample error: {0}")]
    Resample(String),

    /// Value outside the descriptor's range; nothing was changed
    #[error("Invalid value {value} for {effect}.{parameter}: expected [{min}, {max}]")]
    InvalidParameter {
        effect: String,
        parameter: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// No graph node answers to this (effect, parameter) pair
    #[error("Unknown effect parameter: {effect}.{parameter}")]
    UnknownEffect { effect: String, parameter: String },

    /// The catalog allows delay times the delay line cannot hold
    #[error("Delay line holds {available}s but the catalog allows up to {requested}s")]
    DelayLineTooShort { requested: f64, available: f64 },

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Symphonia error
    #[error("Symphonia error: {0}")]
    Symphonia(String),

    /// WAV writer error
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

impl AudioError {
    pub(crate) fn unknown_effect(effect: &str, parameter: &str) -> Self {
        Self::UnknownEffect {
            effect: effect.to_string(),
            parameter: parameter.to_string(),
        }
    }
}
