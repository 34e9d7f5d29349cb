//! Core types for transport control

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Transport state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportState {
    /// Nothing playing, offset at zero
    #[default]
    Stopped,
    /// A playback unit is live
    Playing,
    /// Position held, no unit live
    Paused,
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportState::Stopped => "stopped",
            TransportState::Playing => "playing",
            TransportState::Paused => "paused",
        };
        f.write_str(name)
    }
}

/// Transport configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportConfig {
    /// Cadence of progress reports while playing
    pub progress_interval: Duration,
    /// Rate a fresh transport starts with
    pub initial_rate: f64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            progress_interval: Duration::from_millis(100),
            initial_rate: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_stopped() {
        assert_eq!(TransportState::default(), TransportState::Stopped);
    }

    #[test]
    fn test_state_serializes_lowercase() {
        let json = serde_json::to_string(&TransportState::Paused).unwrap();
        assert_eq!(json, "\"paused\"");
        assert_eq!(TransportState::Playing.to_string(), "playing");
    }

    #[test]
    fn test_default_config() {
        let config = TransportConfig::default();
        assert_eq!(config.progress_interval, Duration::from_millis(100));
        assert_eq!(config.initial_rate, 1.0);
    }
}
