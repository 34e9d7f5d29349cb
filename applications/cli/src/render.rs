//! Offline rendering to WAV
//!
//! Plays a file through the effect graph faster than real time. A manual
//! clock stands in for wall time, advanced by exactly the audio each block
//! covers. Commands from an optional script are applied at their timestamps.
use crate::config::VoxfxConfig;
use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use voxfx_audio::{AudioBuffer, EffectGraph, SymphoniaDecoder};
use voxfx_control::{Command, CommandDispatcher, LogObserver, ParameterRouter, PlaybackAction};
use voxfx_playback::{
    BlockRenderer, ManualClock, ProgressReporter, TransportController, TransportState,
};

/// One line of a command script: a command plus when to apply it
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptEntry {
    /// Seconds of rendered output before the command applies
    pub at: f64,

    #[serde(flatten)]
    pub command: Command,
}

/// Parse line-delimited script entries, sorted by time
///
/// Blank lines and lines starting with `#` are skipped.
pub fn parse_script(text: &str) -> anyhow::Result<Vec<ScriptEntry>> {
    let mut entries = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let entry: ScriptEntry = serde_json::from_str(line)
            .with_context(|| format!("Invalid script entry on line {}", index + 1))?;
        if !entry.at.is_finite() || entry.at < 0.0 {
            anyhow::bail!("Script entry on line {} has invalid time {}", index + 1, entry.at);
        }
        entries.push(entry);
    }
    entries.sort_by(|a, b| a.at.total_cmp(&b.at));
    Ok(entries)
}

/// Summary of a finished render
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderReport {
    pub seconds: f64,
    pub commands_applied: usize,
    pub commands_failed: usize,
}

/// Render `input` through the graph to `output`
///
/// Playback starts at time zero. Rendering continues while the transport
/// plays or script entries are pending, then for the configured tail.
pub fn render_file(
    config: &VoxfxConfig,
    input: &Path,
    output: &Path,
    script: Vec<ScriptEntry>,
) -> anyhow::Result<RenderReport> {
    let catalog = Arc::new(config.load_catalog().context("Failed to load effect catalog")?);
    let sample_rate = config.engine.sample_rate;
    let mut graph = EffectGraph::build(Arc::clone(&catalog), config.graph_config())?;

    let clock = ManualClock::new();
    let mut transport = TransportController::new(
        Arc::new(clock.clone()),
        ProgressReporter::detached(config.progress_interval()),
    );
    let dispatcher = CommandDispatcher::new(ParameterRouter::new(catalog));
    let mut observer = LogObserver::new();
    dispatcher.reset_effects(&mut graph, &mut transport, &mut observer)?;

    let audio = SymphoniaDecoder::new()
        .decode_to_rate(input, sample_rate)
        .with_context(|| format!("Failed to decode {}", input.display()))?;
    transport.load(Arc::new(audio))?;
    dispatcher.dispatch(
        &Command::playback(PlaybackAction::Play),
        &mut graph,
        &mut transport,
        &mut observer,
    )?;

    let mut renderer = BlockRenderer::new(
        clock,
        sample_rate,
        config.render.block_frames,
        config.progress_interval(),
    );
    let block_secs = renderer.block_frames() as f64 / f64::from(sample_rate);
    let mut pending = script.into_iter().peekable();
    let mut samples: Vec<f32> = Vec::new();
    let mut elapsed = 0.0;
    let mut applied = 0;
    let mut failed = 0;

    loop {
        while let Some(entry) = pending.next_if(|entry| entry.at <= elapsed) {
            match dispatcher.dispatch(&entry.command, &mut graph, &mut transport, &mut observer) {
                Ok(message) => {
                    info!("{:>7.2}s {}", elapsed, message);
                    applied += 1;
                }
                Err(e) => {
                    warn!("{:>7.2}s {} rejected: {}", elapsed, entry.command.name, e);
                    failed += 1;
                }
            }
        }

        if transport.state() != TransportState::Playing && pending.peek().is_none() {
            break;
        }
        samples.extend(renderer.render(&mut transport, &mut graph));
        elapsed += block_secs;
    }

    let tail_blocks = (config.render.tail_seconds / block_secs).ceil() as usize;
    for _ in 0..tail_blocks {
        samples.extend(renderer.render(&mut transport, &mut graph));
    }

    let rendered = AudioBuffer::new(samples, sample_rate)?;
    voxfx_audio::write_wav(output, &rendered)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    Ok(RenderReport {
        seconds: rendered.duration_secs(),
        commands_applied: applied,
        commands_failed: failed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> VoxfxConfig {
        let mut config = VoxfxConfig::default();
        config.engine.sample_rate = 8000;
        config.engine.impulse_seconds = 0.1;
        config.engine.max_delay_seconds = 1.0;
        config.render.block_frames = 400;
        config.render.tail_seconds = 0.5;
        config
    }

    fn write_tone(path: &Path, seconds: f64) {
        let frames = (seconds * 8000.0) as usize;
        let mono: Vec<f32> = (0..frames)
            .map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / 8000.0).sin() * 0.5)
            .collect();
        let buffer = AudioBuffer::from_mono(&mono, 8000).unwrap();
        voxfx_audio::write_wav(path, &buffer).unwrap();
    }

    #[test]
    fn test_parse_script_sorts_and_skips_comments() {
        let text = r#"
# turn the reverb up halfway through
{"at": 0.5, "name": "set_effect_parameter", "arguments": {"effect": "reverb", "parameter": "mix", "value": 0.8}}
{"at": 0.0, "name": "set_playback_property", "arguments": {"property": "volume", "value": 0.5}}
"#;
        let entries = parse_script(text).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].at, 0.0);
        assert_eq!(entries[0].command.name, "set_playback_property");
        assert_eq!(entries[1].command.arguments["value"], 0.8);
    }

    #[test]
    fn test_parse_script_rejects_negative_time() {
        let text = r#"{"at": -1, "name": "reset_effects"}"#;
        assert!(parse_script(text).is_err());
    }

    #[test]
    fn test_render_plays_to_end_plus_tail() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("tone.wav");
        let output = dir.path().join("out.wav");
        write_tone(&input, 1.0);

        let report = render_file(&test_config(), &input, &output, Vec::new()).unwrap();
        assert!(output.exists());
        assert!(report.seconds >= 1.5);
        assert!(report.seconds < 1.7);
    }

    #[test]
    fn test_render_applies_script() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("tone.wav");
        let output = dir.path().join("out.wav");
        write_tone(&input, 1.0);

        let script = parse_script(
            r#"{"at": 0.2, "name": "set_effect_parameter", "arguments": {"effect": "filter", "parameter": "frequency", "value": 500}}
{"at": 0.4, "name": "set_effect_parameter", "arguments": {"effect": "filter", "parameter": "frequency", "value": 1}}
{"at": 0.6, "name": "playback_control", "arguments": {"action": "stop"}}"#,
        )
        .unwrap();

        let report = render_file(&test_config(), &input, &output, script).unwrap();
        assert_eq!(report.commands_applied, 2);
        assert_eq!(report.commands_failed, 1);
        assert!(report.seconds < 1.5);
    }
}
