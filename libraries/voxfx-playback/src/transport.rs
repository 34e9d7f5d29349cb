//! Transport controller
//!
//! State machine over {Stopped, Playing, Paused} that owns playback position,
//! playback rate and the lifetime of the live playback unit.
//!
//! Position is tracked the way a one-shot source node forces it to be: a
//! start offset that is only authoritative while not playing, plus the clock
//! reading captured when the current unit started. While playing, the
//! position is `offset + (now - clock_at_start) * rate`.

use crate::clock::Clock;
use crate::error::{PlaybackError, Result};
use crate::events::TransportEvent;
use crate::progress::{ProgressReporter, ProgressTick};
use crate::types::{TransportConfig, TransportState};
use crate::unit::{PlaybackUnit, UnitId};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use voxfx_audio::AudioBuffer;

/// Playback state machine
pub struct TransportController {
    state: TransportState,
    audio: Option<Arc<AudioBuffer>>,
    /// Seconds into the audio; authoritative while not playing
    start_offset: f64,
    /// Clock reading when the live unit started
    clock_at_start: Duration,
    /// Persists across units, stop and reload
    playback_rate: f64,
    /// Present iff state is Playing
    source: Option<PlaybackUnit>,
    next_unit_id: UnitId,
    clock: Arc<dyn Clock>,
    progress: ProgressReporter,
    last_progress: f64,
    pending_events: Vec<TransportEvent>,
}

impl TransportController {
    /// Create a transport driven by `clock` and reporting through `progress`
    pub fn new(clock: Arc<dyn Clock>, progress: ProgressReporter) -> Self {
        Self::with_config(clock, progress, TransportConfig::default())
    }

    pub fn with_config(
        clock: Arc<dyn Clock>,
        progress: ProgressReporter,
        config: TransportConfig,
    ) -> Self {
        Self {
            state: TransportState::Stopped,
            audio: None,
            start_offset: 0.0,
            clock_at_start: Duration::ZERO,
            playback_rate: config.initial_rate,
            source: None,
            next_unit_id: 1,
            clock,
            progress,
            last_progress: 0.0,
            pending_events: Vec::new(),
        }
    }

    // ===== Audio =====

    /// Replace the decoded audio
    ///
    /// Stops playback first; position starts over at zero. The playback rate
    /// is kept.
    pub fn load(&mut self, audio: Arc<AudioBuffer>) -> Result<()> {
        if audio.is_empty() {
            return Err(PlaybackError::EmptyAudio);
        }
        self.stop();
        let duration_secs = audio.duration_secs();
        self.audio = Some(audio);
        info!("Transport loaded {:.2}s of audio", duration_secs);
        self.pending_events
            .push(TransportEvent::Loaded { duration_secs });
        Ok(())
    }

    /// Whether decoded audio is present
    pub fn is_ready(&self) -> bool {
        self.audio.is_some()
    }

    /// Duration of the loaded audio in seconds
    pub fn duration(&self) -> Option<f64> {
        self.audio.as_ref().map(|a| a.duration_secs())
    }

    pub fn audio(&self) -> Option<&Arc<AudioBuffer>> {
        self.audio.as_ref()
    }

    // ===== Playback Control =====

    /// Start playing from the stored offset
    pub fn play(&mut self) -> Result<()> {
        let duration = self.duration().ok_or(PlaybackError::NotReady)?;
        if self.state == TransportState::Playing {
            return Ok(());
        }

        // An offset parked at the very end starts over from the top
        self.start_offset %= duration;
        self.start_unit();
        self.progress.start();
        self.set_state(TransportState::Playing);
        Ok(())
    }

    /// Pause, keeping the position
    pub fn pause(&mut self) {
        if self.state != TransportState::Playing {
            return;
        }
        self.start_offset = self.elapsed();
        self.release_unit();
        self.progress.cancel();
        self.set_state(TransportState::Paused);
    }

    /// Stop and rewind to the start
    pub fn stop(&mut self) {
        self.release_unit();
        self.start_offset = 0.0;
        self.progress.cancel();
        self.set_state(TransportState::Stopped);
        self.report_progress(0.0);
    }

    /// Move the position by `delta` seconds, clamped to the audio
    ///
    /// A playing transport keeps playing from the new position; otherwise
    /// the new offset waits for the next `play()`.
    pub fn seek(&mut self, delta: f64) -> Result<()> {
        let duration = self.duration().ok_or(PlaybackError::NotReady)?;
        if !delta.is_finite() {
            return Err(PlaybackError::InvalidSeek(delta));
        }

        let was_playing = self.state == TransportState::Playing;
        if was_playing {
            self.start_offset = self.elapsed();
            self.release_unit();
        }

        self.start_offset = (self.start_offset + delta).clamp(0.0, duration);
        debug!("Seek {:+.2}s -> {:.2}s", delta, self.start_offset);

        if was_playing {
            self.start_unit();
        }
        self.report_progress(self.progress_percentage());
        Ok(())
    }

    /// Change the playback rate of the live unit and of every later one
    pub fn set_playback_rate(&mut self, rate: f64) -> Result<()> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(PlaybackError::InvalidRate(rate));
        }

        if self.state == TransportState::Playing {
            // Fold the time played at the old rate into the offset
            self.start_offset = self.elapsed();
            self.clock_at_start = self.clock.now();
        }
        if let Some(unit) = self.source.as_mut() {
            unit.set_rate(rate);
        }

        self.playback_rate = rate;
        self.pending_events
            .push(TransportEvent::RateChanged { rate });
        Ok(())
    }

    // ===== Progress =====

    /// Handle a tick from the progress reporter
    ///
    /// Ticks from a cancelled run are ignored.
    pub fn on_progress_tick(&mut self, tick: ProgressTick) {
        if self.progress.accepts(tick) {
            self.tick();
        }
    }

    /// Report progress now, as a reporter tick would
    ///
    /// Does nothing unless playing. Reaching the end of the audio counts as
    /// the live unit running out.
    pub fn tick(&mut self) {
        if self.state != TransportState::Playing {
            return;
        }
        let percentage = self.progress_percentage();
        self.report_progress(percentage);

        if percentage >= 100.0 {
            if let Some(id) = self.source.as_ref().map(PlaybackUnit::id) {
                self.end_of_media(id);
            }
        }
    }

    /// Current progress, 0.0 to 100.0
    pub fn progress_percentage(&self) -> f64 {
        match self.duration() {
            Some(duration) if duration > 0.0 => (100.0 * self.elapsed() / duration).min(100.0),
            _ => 0.0,
        }
    }

    /// The most recent value reported to observers
    pub fn last_reported_progress(&self) -> f64 {
        self.last_progress
    }

    // ===== Rendering =====

    /// Pull the next block of interleaved stereo audio from the live unit
    ///
    /// Writes silence when nothing is playing. When the unit runs out the
    /// transport stops itself.
    pub fn pull(&mut self, out: &mut [f32]) -> usize {
        let Some(unit) = self.source.as_mut() else {
            out.fill(0.0);
            return 0;
        };

        let produced = unit.render(out);
        if unit.is_exhausted() {
            let id = unit.id();
            self.end_of_media(id);
        }
        produced
    }

    /// Natural end of a unit; stops the transport if that unit is still live
    pub fn end_of_media(&mut self, unit: UnitId) {
        let is_live = self.source.as_ref().is_some_and(|s| s.id() == unit);
        if self.state == TransportState::Playing && is_live {
            info!("End of media");
            self.stop();
        }
    }

    // ===== State Queries =====

    pub fn state(&self) -> TransportState {
        self.state
    }

    /// Stored start offset in seconds
    pub fn start_offset(&self) -> f64 {
        self.start_offset
    }

    /// Current position in seconds
    pub fn position(&self) -> f64 {
        self.elapsed()
    }

    pub fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    /// The live playback unit, present iff playing
    pub fn source(&self) -> Option<&PlaybackUnit> {
        self.source.as_ref()
    }

    pub fn progress_reporter(&self) -> &ProgressReporter {
        &self.progress
    }

    /// Take all pending events
    pub fn drain_events(&mut self) -> Vec<TransportEvent> {
        std::mem::take(&mut self.pending_events)
    }

    pub fn has_pending_events(&self) -> bool {
        !self.pending_events.is_empty()
    }

    // ===== Internals =====

    fn elapsed(&self) -> f64 {
        if self.state != TransportState::Playing {
            return self.start_offset;
        }
        let wall = self.clock.now().saturating_sub(self.clock_at_start);
        let elapsed = self.start_offset + wall.as_secs_f64() * self.playback_rate;
        self.duration().map_or(elapsed, |d| elapsed.min(d))
    }

    /// Create the live unit at the stored offset; the previous one must be
    /// released already
    fn start_unit(&mut self) {
        debug_assert!(self.source.is_none());
        let Some(audio) = self.audio.clone() else {
            return;
        };
        let id = self.next_unit_id;
        self.next_unit_id += 1;
        self.source = Some(PlaybackUnit::new(
            id,
            audio,
            self.start_offset,
            self.playback_rate,
        ));
        self.clock_at_start = self.clock.now();
        debug!("Unit {} started at {:.2}s", id, self.start_offset);
    }

    fn release_unit(&mut self) {
        if let Some(unit) = self.source.take() {
            debug!("Unit {} released", unit.id());
        }
    }

    fn set_state(&mut self, state: TransportState) {
        if self.state != state {
            info!("Transport {} -> {}", self.state, state);
            self.state = state;
            self.pending_events
                .push(TransportEvent::StateChanged { state });
        }
    }

    fn report_progress(&mut self, percentage: f64) {
        self.last_progress = percentage;
        self.pending_events
            .push(TransportEvent::Progress { percentage });
    }
}
