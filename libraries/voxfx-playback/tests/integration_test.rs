//! Integration tests for the transport
//!
//! Scenarios run against a manual clock so wall time is exact.

use std::sync::Arc;
use std::time::Duration;
use voxfx_audio::{AudioBuffer, EffectGraph, GraphConfig};
use voxfx_core::ParameterCatalog;
use voxfx_playback::{
    BlockRenderer, ManualClock, ProgressReporter, TransportController, TransportEvent,
    TransportState,
};

// ===== Test Helpers =====

const SAMPLE_RATE: u32 = 1000;

fn loaded_transport(seconds: f64) -> (TransportController, ManualClock) {
    let clock = ManualClock::new();
    let mut transport = TransportController::new(
        Arc::new(clock.clone()),
        ProgressReporter::detached(Duration::from_millis(100)),
    );
    transport
        .load(Arc::new(AudioBuffer::silence(seconds, SAMPLE_RATE).unwrap()))
        .unwrap();
    transport.drain_events();
    (transport, clock)
}

fn progress_events(events: &[TransportEvent]) -> Vec<f64> {
    events
        .iter()
        .filter_map(|e| match e {
            TransportEvent::Progress { percentage } => Some(*percentage),
            _ => None,
        })
        .collect()
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

// ===== Scenario =====

#[test]
fn test_ten_second_scenario() {
    let (mut transport, clock) = loaded_transport(10.0);

    transport.play().unwrap();
    clock.advance_secs(3.0);
    transport.tick();
    assert!(approx(transport.last_reported_progress(), 30.0));

    transport.pause();
    assert!(approx(transport.start_offset(), 3.0));
    transport.play().unwrap();
    assert!(approx(transport.position(), 3.0), "resumes from 3s, not 0");

    transport.pause();
    transport.seek(2.0).unwrap();
    assert!(approx(transport.start_offset(), 5.0));
    assert_eq!(transport.state(), TransportState::Paused);
    assert!(transport.source().is_none());

    transport.stop();
    assert_eq!(transport.start_offset(), 0.0);
    assert_eq!(transport.last_reported_progress(), 0.0);
}

#[test]
fn test_progress_ticks_only_while_playing() {
    let (mut transport, clock) = loaded_transport(10.0);

    transport.tick();
    assert!(transport.drain_events().is_empty());

    transport.play().unwrap();
    for _ in 0..5 {
        clock.advance(Duration::from_millis(100));
        transport.tick();
    }
    let reports = progress_events(&transport.drain_events());
    assert_eq!(reports.len(), 5);
    assert!(approx(reports[4], 5.0));

    transport.pause();
    transport.drain_events();
    clock.advance_secs(2.0);
    transport.tick();
    assert!(transport.drain_events().is_empty());
    assert!(approx(transport.last_reported_progress(), 5.0));
}

#[test]
fn test_seek_always_reports_once() {
    let (mut transport, _clock) = loaded_transport(10.0);
    transport.seek(2.5).unwrap();
    let reports = progress_events(&transport.drain_events());
    assert_eq!(reports.len(), 1);
    assert!(approx(reports[0], 25.0));
}

#[test]
fn test_progress_is_capped_at_100() {
    let (mut transport, clock) = loaded_transport(1.0);
    transport.set_playback_rate(2.0).unwrap();
    transport.play().unwrap();
    clock.advance_secs(0.75);
    transport.tick();

    let reports = progress_events(&transport.drain_events());
    assert!(reports.iter().all(|&p| p <= 100.0));
    assert_eq!(transport.state(), TransportState::Stopped);
}

#[test]
fn test_speed_persists_across_stop_and_start() {
    let (mut transport, clock) = loaded_transport(10.0);
    transport.set_playback_rate(1.5).unwrap();
    transport.play().unwrap();
    transport.stop();
    transport.play().unwrap();
    assert_eq!(transport.source().unwrap().rate(), 1.5);

    clock.advance_secs(2.0);
    assert!(approx(transport.position(), 3.0));
}

#[test]
fn test_state_changes_are_reported_once_per_transition() {
    let (mut transport, _clock) = loaded_transport(10.0);
    transport.play().unwrap();
    transport.play().unwrap();
    transport.pause();
    transport.pause();
    transport.stop();
    transport.stop();

    let states: Vec<TransportState> = transport
        .drain_events()
        .into_iter()
        .filter_map(|e| match e {
            TransportEvent::StateChanged { state } => Some(state),
            _ => None,
        })
        .collect();
    assert_eq!(
        states,
        vec![
            TransportState::Playing,
            TransportState::Paused,
            TransportState::Stopped
        ]
    );
}

// ===== Rendering =====

#[test]
fn test_block_renderer_plays_to_the_end() {
    let catalog = Arc::new(ParameterCatalog::bundled().unwrap());
    let config = GraphConfig {
        sample_rate: 8000,
        max_delay_seconds: 1.0,
        impulse_seconds: 0.1,
    };
    let mut graph = EffectGraph::build(catalog, config).unwrap();
    graph.set_effect("reverb", "mix", 0.0).unwrap();
    graph.set_effect("delay", "feedback", 0.0).unwrap();

    let clock = ManualClock::new();
    let mut transport = TransportController::new(
        Arc::new(clock.clone()),
        ProgressReporter::detached(Duration::from_millis(100)),
    );
    let tone: Vec<f32> = (0..8000).map(|i| (i as f32 * 0.05).sin() * 0.5).collect();
    transport
        .load(Arc::new(AudioBuffer::from_mono(&tone, 8000).unwrap()))
        .unwrap();
    transport.play().unwrap();

    let mut renderer = BlockRenderer::new(clock, 8000, 800, Duration::from_millis(100));
    let mut blocks = 0;
    while transport.state() == TransportState::Playing && blocks < 50 {
        let block = renderer.render(&mut transport, &mut graph);
        assert!(block.iter().all(|s| s.is_finite()));
        blocks += 1;
    }

    assert_eq!(transport.state(), TransportState::Stopped);
    assert!((10..=11).contains(&blocks));
    assert_eq!(transport.start_offset(), 0.0);
}
