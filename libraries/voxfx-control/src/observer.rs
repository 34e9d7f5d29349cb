//! State observers
//!
//! The UI (or any other front end) learns about engine state only through a
//! [`StateObserver`]. Callbacks are made from the engine task, after the
//! mutation they describe has been applied.

use crate::command::Command;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, trace};
use voxfx_playback::TransportState;

/// Receiver of engine state changes
pub trait StateObserver: Send {
    /// Playback progress, 0.0 to 100.0
    fn on_progress(&mut self, percentage: f64);

    /// A parameter now has a new value; `display` is unit-formatted
    fn on_parameter_changed(&mut self, effect_id: &str, param_id: &str, display: &str);

    fn on_transport_state_changed(&mut self, state: TransportState);

    /// The last command applied, after all its other callbacks
    fn on_command(&mut self, _command: &Command) {}
}

/// Observer callbacks as data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ControlEvent {
    Progress {
        percentage: f64,
    },
    ParameterChanged {
        effect: String,
        parameter: String,
        display: String,
    },
    TransportStateChanged {
        state: TransportState,
    },
    CommandApplied {
        name: String,
    },
}

/// Observer that keeps every callback in memory
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Vec<ControlEvent>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[ControlEvent] {
        &self.events
    }

    /// Take all recorded events
    pub fn take(&mut self) -> Vec<ControlEvent> {
        std::mem::take(&mut self.events)
    }
}

impl StateObserver for RecordingObserver {
    fn on_progress(&mut self, percentage: f64) {
        self.events.push(ControlEvent::Progress { percentage });
    }

    fn on_parameter_changed(&mut self, effect_id: &str, param_id: &str, display: &str) {
        self.events.push(ControlEvent::ParameterChanged {
            effect: effect_id.to_string(),
            parameter: param_id.to_string(),
            display: display.to_string(),
        });
    }

    fn on_transport_state_changed(&mut self, state: TransportState) {
        self.events
            .push(ControlEvent::TransportStateChanged { state });
    }

    fn on_command(&mut self, command: &Command) {
        self.events.push(ControlEvent::CommandApplied {
            name: command.name.clone(),
        });
    }
}

/// Observer that forwards callbacks over a channel
///
/// Sends never block the engine; once the receiver is dropped events are
/// discarded.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<ControlEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ControlEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: ControlEvent) {
        // A closed receiver only means nobody is listening any more
        let _ = self.tx.send(event);
    }
}

impl StateObserver for ChannelObserver {
    fn on_progress(&mut self, percentage: f64) {
        self.send(ControlEvent::Progress { percentage });
    }

    fn on_parameter_changed(&mut self, effect_id: &str, param_id: &str, display: &str) {
        self.send(ControlEvent::ParameterChanged {
            effect: effect_id.to_string(),
            parameter: param_id.to_string(),
            display: display.to_string(),
        });
    }

    fn on_transport_state_changed(&mut self, state: TransportState) {
        self.send(ControlEvent::TransportStateChanged { state });
    }

    fn on_command(&mut self, command: &Command) {
        self.send(ControlEvent::CommandApplied {
            name: command.name.clone(),
        });
    }
}

/// Observer that only logs, keeping the latest progress and state
#[derive(Debug, Default)]
pub struct LogObserver {
    last_progress: f64,
    state: TransportState,
}

impl LogObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_progress(&self) -> f64 {
        self.last_progress
    }

    pub fn state(&self) -> TransportState {
        self.state
    }
}

impl StateObserver for LogObserver {
    fn on_progress(&mut self, percentage: f64) {
        trace!("Progress {:.1}%", percentage);
        self.last_progress = percentage;
    }

    fn on_parameter_changed(&mut self, effect_id: &str, param_id: &str, display: &str) {
        let value = display;
        debug!("{}.{} = {}", effect_id, param_id, value);
    }

    fn on_transport_state_changed(&mut self, state: TransportState) {
        debug!("Transport {:?}", state);
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_wire_format() {
        let event = ControlEvent::ParameterChanged {
            effect: "reverb".to_string(),
            parameter: "mix".to_string(),
            display: "50%".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "event": "parameter_changed",
                "effect": "reverb",
                "parameter": "mix",
                "display": "50%"
            })
        );

        let state = ControlEvent::TransportStateChanged {
            state: TransportState::Playing,
        };
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({ "event": "transport_state_changed", "state": "playing" })
        );
    }

    #[test]
    fn test_log_observer_keeps_only_the_latest() {
        let mut observer = LogObserver::new();
        for percentage in [10.0, 20.0, 30.0] {
            observer.on_progress(percentage);
        }
        observer.on_transport_state_changed(TransportState::Paused);
        observer.on_parameter_changed("reverb", "mix", "50%");
        assert_eq!(observer.last_progress(), 30.0);
        assert_eq!(observer.state(), TransportState::Paused);
    }

    #[test]
    fn test_channel_observer_survives_closed_receiver() {
        let (mut observer, rx) = ChannelObserver::new();
        observer.on_progress(10.0);
        drop(rx);
        observer.on_progress(20.0);
    }
}
