/// Core error types for voxfx
use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while loading or querying the parameter catalog
#[derive(Error, Debug)]
pub enum CoreError {
    /// Catalog structure is not what the loader expects
    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    /// A descriptor's default sits outside its own range
    #[error("Default {default} for {effect}.{parameter} is outside [{min}, {max}]")]
    DefaultOutOfRange {
        effect: String,
        parameter: String,
        default: f64,
        min: f64,
        max: f64,
    },

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// Create an invalid catalog error
    pub fn invalid_catalog(msg: impl Into<String>) -> Self {
        Self::InvalidCatalog(msg.into())
    }
}
