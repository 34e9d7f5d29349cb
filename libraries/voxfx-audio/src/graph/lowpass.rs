//! Low-pass filter node
//!
//! Second-order Butterworth low-pass, one biquad per channel.

use super::AudioNode;
use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type, Q_BUTTERWORTH_F32};
use tracing::warn;

/// Highest cutoff as a fraction of Nyquist the coefficients are computed for
const NYQUIST_HEADROOM: f64 = 0.99;

pub struct LowPassFilter {
    sample_rate: u32,
    /// Requested cutoff in Hz
    cutoff: f64,
    coefficients: Coefficients<f32>,
    left: DirectForm2Transposed<f32>,
    right: DirectForm2Transposed<f32>,
}

impl LowPassFilter {
    /// Create a filter at `cutoff` Hz
    ///
    /// Returns `None` if no valid coefficients exist for the sample rate.
    pub fn new(sample_rate: u32, cutoff: f64) -> Option<Self> {
        let coefficients = compute_coefficients(sample_rate, cutoff)?;
        Some(Self {
            sample_rate,
            cutoff,
            coefficients,
            left: DirectForm2Transposed::<f32>::new(coefficients),
            right: DirectForm2Transposed::<f32>::new(coefficients),
        })
    }

    /// Move the cutoff; the requested value is kept even when it has to be
    /// pulled below Nyquist for the coefficients
    pub fn set_cutoff(&mut self, cutoff: f64) {
        self.cutoff = cutoff;
        match compute_coefficients(self.sample_rate, cutoff) {
            Some(coefficients) => {
                self.coefficients = coefficients;
                self.left.update_coefficients(coefficients);
                self.right.update_coefficients(coefficients);
            }
            None => warn!("Keeping previous low-pass coefficients for cutoff {} Hz", cutoff),
        }
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }
}

fn compute_coefficients(sample_rate: u32, cutoff: f64) -> Option<Coefficients<f32>> {
    let nyquist = f64::from(sample_rate) / 2.0;
    let effective = cutoff.clamp(1.0, nyquist * NYQUIST_HEADROOM) as f32;
    Coefficients::<f32>::from_params(
        Type::LowPass,
        (sample_rate as f32).hz(),
        effective.hz(),
        Q_BUTTERWORTH_F32,
    )
    .ok()
}

impl AudioNode for LowPassFilter {
    fn process(&mut self, buffer: &mut [f32]) {
        for frame in buffer.chunks_exact_mut(2) {
            frame[0] = self.left.run(frame[0]);
            frame[1] = self.right.run(frame[1]);
        }
    }

    fn reset(&mut self) {
        self.left = DirectForm2Transposed::<f32>::new(self.coefficients);
        self.right = DirectForm2Transposed::<f32>::new(self.coefficients);
    }

    fn name(&self) -> &str {
        "Low-pass"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(freq: f32, frames: usize, sample_rate: u32) -> Vec<f32> {
        (0..frames)
            .flat_map(|i| {
                let s = (2.0 * PI * freq * i as f32 / sample_rate as f32).sin();
                [s, s]
            })
            .collect()
    }

    fn rms(buffer: &[f32]) -> f32 {
        (buffer.iter().map(|s| s * s).sum::<f32>() / buffer.len() as f32).sqrt()
    }

    #[test]
    fn test_attenuates_above_cutoff() {
        let mut filter = LowPassFilter::new(44100, 500.0).unwrap();
        let mut high = sine(8000.0, 4410, 44100);
        let before = rms(&high);
        filter.process(&mut high);
        // Skip the transient
        assert!(rms(&high[1000..]) < before * 0.05);
    }

    #[test]
    fn test_passes_below_cutoff() {
        let mut filter = LowPassFilter::new(44100, 5000.0).unwrap();
        let mut low = sine(100.0, 4410, 44100);
        let before = rms(&low);
        filter.process(&mut low);
        assert!((rms(&low[1000..]) - before).abs() < before * 0.05);
    }

    #[test]
    fn test_cutoff_above_nyquist_keeps_requested_value() {
        let mut filter = LowPassFilter::new(8000, 1000.0).unwrap();
        filter.set_cutoff(20_000.0);
        assert_eq!(filter.cutoff(), 20_000.0);

        let mut buffer = sine(100.0, 800, 8000);
        filter.process(&mut buffer);
        assert!(buffer.iter().all(|s| s.is_finite()));
    }
}
