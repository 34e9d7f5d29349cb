//! Playback units
//!
//! A unit is one pass of the decoded buffer into the effect graph, from a
//! start offset until it is stopped or runs out. Units are never restarted:
//! play and seek create a fresh one, mirroring one-shot source nodes.

use std::sync::Arc;
use voxfx_audio::{AudioBuffer, CHANNELS};

/// Identifier of a playback unit, unique per transport
pub type UnitId = u64;

/// A live reader over the decoded buffer
#[derive(Debug)]
pub struct PlaybackUnit {
    id: UnitId,
    audio: Arc<AudioBuffer>,
    /// Read position in frames, fractional when rate != 1
    position: f64,
    rate: f64,
}

impl PlaybackUnit {
    /// Create a unit reading from `start_secs` at `rate`
    pub fn new(id: UnitId, audio: Arc<AudioBuffer>, start_secs: f64, rate: f64) -> Self {
        let position = (start_secs * f64::from(audio.sample_rate())).max(0.0);
        Self {
            id,
            audio,
            position,
            rate,
        }
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
    }

    /// Read position in seconds
    pub fn position_secs(&self) -> f64 {
        self.position / f64::from(self.audio.sample_rate())
    }

    /// Whether the read position has passed the last frame
    pub fn is_exhausted(&self) -> bool {
        self.position >= self.audio.frames() as f64
    }

    /// Fill `out` with interleaved stereo frames, linearly interpolated at
    /// the unit's rate
    ///
    /// Returns the number of frames produced; the remainder of `out` is
    /// zeroed once the buffer runs out.
    pub fn render(&mut self, out: &mut [f32]) -> usize {
        let samples = self.audio.samples();
        let frames = self.audio.frames();
        let mut produced = 0;

        for frame in out.chunks_exact_mut(CHANNELS) {
            if self.position >= frames as f64 {
                frame.fill(0.0);
                continue;
            }

            let index = self.position.floor() as usize;
            let fraction = (self.position - index as f64) as f32;
            let next = (index + 1).min(frames - 1);
            for (ch, sample) in frame.iter_mut().enumerate() {
                let a = samples[index * CHANNELS + ch];
                let b = samples[next * CHANNELS + ch];
                *sample = a + (b - a) * fraction;
            }

            self.position += self.rate;
            produced += 1;
        }

        produced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(frames: usize, sample_rate: u32) -> Arc<AudioBuffer> {
        let mono: Vec<f32> = (0..frames).map(|i| i as f32).collect();
        Arc::new(AudioBuffer::from_mono(&mono, sample_rate).unwrap())
    }

    #[test]
    fn test_starts_at_offset() {
        let mut unit = PlaybackUnit::new(1, ramp(100, 10), 2.0, 1.0);
        let mut out = vec![0.0; 4];
        unit.render(&mut out);
        assert_eq!(out, vec![20.0, 20.0, 21.0, 21.0]);
    }

    #[test]
    fn test_rate_interpolates() {
        let mut unit = PlaybackUnit::new(1, ramp(100, 10), 0.0, 0.5);
        let mut out = vec![0.0; 6];
        unit.render(&mut out);
        assert_eq!(out, vec![0.0, 0.0, 0.5, 0.5, 1.0, 1.0]);
    }

    #[test]
    fn test_exhausts_and_zero_fills() {
        let mut unit = PlaybackUnit::new(1, ramp(4, 10), 0.0, 1.0);
        let mut out = vec![9.0; 12];
        let produced = unit.render(&mut out);
        assert_eq!(produced, 4);
        assert!(unit.is_exhausted());
        assert!(out[8..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_position_tracks_rate() {
        let mut unit = PlaybackUnit::new(1, ramp(100, 10), 1.0, 2.0);
        let mut out = vec![0.0; 10];
        unit.render(&mut out);
        assert!((unit.position_secs() - 2.0).abs() < 1e-9);
    }
}
