//! Command dispatcher
//!
//! Applies a [`Command`] to the graph and transport, identically for UI and
//! remote commands, then tells the observer what changed. A command that
//! fails validation or is rejected by the router produces no callbacks.

use crate::command::{Command, CommandResponse, Operation, PlaybackAction, SeekDirection};
use crate::error::Result;
use crate::observer::StateObserver;
use crate::router::{ParameterEcho, ParameterRouter};
use tracing::{debug, info, warn};
use voxfx_audio::EffectGraph;
use voxfx_core::PLAYBACK_EFFECT_ID;
use voxfx_playback::{TransportController, TransportEvent};

pub struct CommandDispatcher {
    router: ParameterRouter,
}

impl CommandDispatcher {
    pub fn new(router: ParameterRouter) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &ParameterRouter {
        &self.router
    }

    /// Validate and apply `command`, returning the response message
    ///
    /// On success the observer receives the parameter echo (if any), the
    /// transport events the command caused, and finally `on_command`.
    pub fn dispatch(
        &self,
        command: &Command,
        graph: &mut EffectGraph,
        transport: &mut TransportController,
        observer: &mut dyn StateObserver,
    ) -> Result<String> {
        let operation = Operation::parse(command).map_err(|e| {
            warn!("Rejected {} command '{}': {}", command.surface, command.name, e);
            e
        })?;

        let result = self.apply(operation, graph, transport, observer);
        forward_transport_events(transport, observer);

        match &result {
            Ok(message) => {
                info!("[{}] {} -> {}", command.surface, command.name, message);
                observer.on_command(command);
            }
            Err(e) => warn!("[{}] {} failed: {}", command.surface, command.name, e),
        }
        result
    }

    /// Dispatch and wrap the outcome as a wire response
    pub fn respond(
        &self,
        command: &Command,
        graph: &mut EffectGraph,
        transport: &mut TransportController,
        observer: &mut dyn StateObserver,
    ) -> CommandResponse {
        self.dispatch(command, graph, transport, observer).into()
    }

    /// Restore every catalog default and echo each parameter
    pub fn reset_effects(
        &self,
        graph: &mut EffectGraph,
        transport: &mut TransportController,
        observer: &mut dyn StateObserver,
    ) -> Result<usize> {
        let echoes = self.router.apply_defaults(graph, transport)?;
        for ParameterEcho {
            effect,
            parameter,
            display,
        } in &echoes
        {
            observer.on_parameter_changed(effect, parameter, display);
        }
        Ok(echoes.len())
    }

    fn apply(
        &self,
        operation: Operation,
        graph: &mut EffectGraph,
        transport: &mut TransportController,
        observer: &mut dyn StateObserver,
    ) -> Result<String> {
        match operation {
            Operation::SetEffectParameter {
                effect,
                parameter,
                value,
            } => {
                let display = self
                    .router
                    .set_effect_parameter(graph, &effect, &parameter, value)?;
                observer.on_parameter_changed(&effect, &parameter, &display);
                Ok(format!("Set {effect} {parameter} to {display}"))
            }
            Operation::SetPlaybackProperty { property, value } => {
                let display = self
                    .router
                    .set_playback_property(graph, transport, &property, value)?;
                observer.on_parameter_changed(PLAYBACK_EFFECT_ID, &property, &display);
                Ok(format!("Set {PLAYBACK_EFFECT_ID} {property} to {display}"))
            }
            Operation::SeekAudio { direction, seconds } => {
                let delta = match direction {
                    SeekDirection::Forward => seconds,
                    SeekDirection::Backward => -seconds,
                };
                transport.seek(delta)?;
                Ok(format!(
                    "Seeked {} {}s to {:.1}s.",
                    direction.as_str(),
                    seconds,
                    transport.position()
                ))
            }
            Operation::PlaybackControl(action) => {
                let message = match action {
                    PlaybackAction::Play => {
                        transport.play()?;
                        "Playback started."
                    }
                    PlaybackAction::Pause => {
                        transport.pause();
                        "Playback paused."
                    }
                    PlaybackAction::Stop => {
                        transport.stop();
                        "Playback stopped."
                    }
                };
                Ok(message.to_string())
            }
            Operation::ResetEffects => {
                let count = self.reset_effects(graph, transport, observer)?;
                Ok(format!("Reset {count} parameters to defaults."))
            }
        }
    }
}

/// Drain the transport's queued events into the observer
pub fn forward_transport_events(
    transport: &mut TransportController,
    observer: &mut dyn StateObserver,
) {
    for event in transport.drain_events() {
        match event {
            TransportEvent::StateChanged { state } => observer.on_transport_state_changed(state),
            TransportEvent::Progress { percentage } => observer.on_progress(percentage),
            TransportEvent::RateChanged { rate } => debug!("Playback rate now {}", rate),
            TransportEvent::Loaded { duration_secs } => {
                debug!("Loaded {:.2}s of audio", duration_secs);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ControlError;
    use crate::observer::{ControlEvent, RecordingObserver};
    use std::sync::Arc;
    use std::time::Duration;
    use voxfx_audio::{AudioBuffer, GraphConfig};
    use voxfx_core::ParameterCatalog;
    use voxfx_playback::{ManualClock, ProgressReporter, TransportState};

    struct Fixture {
        dispatcher: CommandDispatcher,
        graph: EffectGraph,
        transport: TransportController,
        observer: RecordingObserver,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_router_catalog(Arc::new(ParameterCatalog::bundled().unwrap()))
        }

        /// Bundled graph, router answering to `catalog`
        fn with_router_catalog(catalog: Arc<ParameterCatalog>) -> Self {
            let graph = EffectGraph::build(
                Arc::new(ParameterCatalog::bundled().unwrap()),
                GraphConfig {
                    sample_rate: 8000,
                    max_delay_seconds: 1.0,
                    impulse_seconds: 0.1,
                },
            )
            .unwrap();
            let transport = TransportController::new(
                Arc::new(ManualClock::new()),
                ProgressReporter::detached(Duration::from_millis(100)),
            );
            Self {
                dispatcher: CommandDispatcher::new(ParameterRouter::new(catalog)),
                graph,
                transport,
                observer: RecordingObserver::new(),
            }
        }

        fn dispatch(&mut self, command: &Command) -> Result<String> {
            self.dispatcher.dispatch(
                command,
                &mut self.graph,
                &mut self.transport,
                &mut self.observer,
            )
        }
    }

    #[test]
    fn test_play_without_audio_is_silent() {
        let mut fx = Fixture::new();
        let err = fx
            .dispatch(&Command::playback(PlaybackAction::Play))
            .unwrap_err();
        assert!(err.is_not_ready());
        assert!(fx.observer.events().is_empty());
    }

    #[test]
    fn test_set_effect_message_and_echo() {
        let mut fx = Fixture::new();
        let message = fx
            .dispatch(&Command::set_effect_parameter("filter", "frequency", 2500.0))
            .unwrap();
        assert_eq!(message, "Set filter frequency to 2.5kHz");
        assert_eq!(
            fx.observer.take(),
            vec![
                ControlEvent::ParameterChanged {
                    effect: "filter".to_string(),
                    parameter: "frequency".to_string(),
                    display: "2.5kHz".to_string(),
                },
                ControlEvent::CommandApplied {
                    name: "set_effect_parameter".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_rejected_value_has_no_callbacks() {
        let mut fx = Fixture::new();
        let err = fx
            .dispatch(&Command::set_effect_parameter("delay", "feedback", 0.99))
            .unwrap_err();
        assert!(matches!(err, ControlError::Audio(_)));
        assert!(fx.observer.events().is_empty());
        assert_eq!(fx.graph.delay_feedback_gain(), 0.4);
    }

    #[test]
    fn test_seek_backward_reports_progress() {
        let mut fx = Fixture::new();
        fx.transport
            .load(Arc::new(AudioBuffer::silence(10.0, 1000).unwrap()))
            .unwrap();
        fx.transport.drain_events();

        fx.dispatch(&Command::seek(SeekDirection::Forward, 4.0))
            .unwrap();
        fx.dispatch(&Command::seek(SeekDirection::Backward, 1.0))
            .unwrap();
        assert!((fx.transport.start_offset() - 3.0).abs() < 1e-9);

        let progress: Vec<f64> = fx
            .observer
            .take()
            .into_iter()
            .filter_map(|e| match e {
                ControlEvent::Progress { percentage } => Some(percentage),
                _ => None,
            })
            .collect();
        assert_eq!(progress.len(), 2);
        assert!((progress[1] - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_reset_effects_echoes_every_parameter() {
        let mut fx = Fixture::new();
        fx.dispatch(&Command::set_effect_parameter("reverb", "mix", 0.9))
            .unwrap();
        fx.observer.take();

        let message = fx.dispatch(&Command::reset_effects()).unwrap();
        assert_eq!(message, "Reset 6 parameters to defaults.");
        assert_eq!(fx.graph.reverb_wet_gain(), 0.3);

        let echoes = fx
            .observer
            .events()
            .iter()
            .filter(|e| matches!(e, ControlEvent::ParameterChanged { .. }))
            .count();
        assert_eq!(echoes, 6);
    }

    #[test]
    fn test_reset_skips_parameters_the_graph_lacks() {
        let catalog = ParameterCatalog::from_json_str(
            r#"{
                "chorus": {"name": "Chorus", "parameters": {
                    "depth": {"label": "Depth", "min": 0, "max": 1, "step": 0.01, "defaultValue": 0.5, "unit": "percentage"}
                }},
                "reverb": {"name": "Reverb", "parameters": {
                    "mix": {"label": "Mix", "min": 0, "max": 1, "step": 0.01, "defaultValue": 0.3, "unit": "percentage"}
                }}
            }"#,
        )
        .unwrap();
        let mut fx = Fixture::with_router_catalog(Arc::new(catalog));
        fx.dispatch(&Command::set_effect_parameter("reverb", "mix", 0.9))
            .unwrap();
        fx.observer.take();

        let message = fx.dispatch(&Command::reset_effects()).unwrap();
        assert_eq!(message, "Reset 1 parameters to defaults.");
        assert_eq!(fx.graph.reverb_wet_gain(), 0.3);
        assert_eq!(
            fx.observer.events()[0],
            ControlEvent::ParameterChanged {
                effect: "reverb".to_string(),
                parameter: "mix".to_string(),
                display: "30%".to_string(),
            }
        );
    }

    #[test]
    fn test_pause_then_stop_messages() {
        let mut fx = Fixture::new();
        fx.transport
            .load(Arc::new(AudioBuffer::silence(5.0, 1000).unwrap()))
            .unwrap();

        let play = fx.dispatch(&Command::playback(PlaybackAction::Play)).unwrap();
        let pause = fx
            .dispatch(&Command::playback(PlaybackAction::Pause))
            .unwrap();
        let stop = fx.dispatch(&Command::playback(PlaybackAction::Stop)).unwrap();
        assert_eq!(play, "Playback started.");
        assert_eq!(pause, "Playback paused.");
        assert_eq!(stop, "Playback stopped.");
        assert_eq!(fx.transport.state(), TransportState::Stopped);
    }
}
