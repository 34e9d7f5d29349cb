//! Transport Events
//!
//! Queued by the controller and drained by whoever drives it. Progress is
//! emitted on every reporter tick while playing, once on every seek, and as
//! zero on every stop.

use crate::types::TransportState;
use serde::{Deserialize, Serialize};

/// Events emitted by the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportEvent {
    /// Transport moved to a new state
    StateChanged { state: TransportState },

    /// Playback progress, 0.0 to 100.0
    Progress { percentage: f64 },

    /// Playback rate changed
    RateChanged { rate: f64 },

    /// New audio replaced the previous buffer
    Loaded { duration_secs: f64 },
}
