//! Decoded audio held in memory
use crate::error::{AudioError, Result};

/// Channel count of every buffer the engine handles
pub const CHANNELS: usize = 2;

/// Decoded audio, interleaved stereo f32 in [-1.0, 1.0]
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Wrap interleaved stereo samples
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(AudioError::InvalidBuffer("sample rate is zero".to_string()));
        }
        if samples.len() % CHANNELS != 0 {
            return Err(AudioError::InvalidBuffer(format!(
                "{} samples do not form whole stereo frames",
                samples.len()
            )));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Duplicate a mono signal into both channels
    pub fn from_mono(mono: &[f32], sample_rate: u32) -> Result<Self> {
        let samples = mono.iter().flat_map(|&s| [s, s]).collect();
        Self::new(samples, sample_rate)
    }

    /// Buffer of `seconds` of silence
    pub fn silence(seconds: f64, sample_rate: u32) -> Result<Self> {
        let frames = (seconds * f64::from(sample_rate)).round() as usize;
        Self::new(vec![0.0; frames * CHANNELS], sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of stereo frames
    pub fn frames(&self) -> usize {
        self.samples.len() / CHANNELS
    }

    /// Length in seconds
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}
