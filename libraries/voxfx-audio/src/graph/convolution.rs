//! Convolution reverb node
//!
//! FFT overlap-add convolution of an interleaved stereo signal with a stereo
//! impulse response. The node produces the fully wet signal; the graph owns
//! the wet and dry gains.

use super::AudioNode;
use crate::error::{AudioError, Result};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Minimum FFT size for efficient processing
const MIN_FFT_SIZE: usize = 256;

/// Input block size the FFT is dimensioned around
const BLOCK_SIZE: usize = 512;

pub struct Convolver {
    fft_size: usize,
    /// Input frames consumed per FFT pass
    block_size: usize,
    ir_frames: usize,
    /// Pre-computed spectra of the impulse response, per channel
    ir_spectra: [Vec<Complex<f32>>; 2],
    fft_forward: Arc<dyn Fft<f32>>,
    fft_inverse: Arc<dyn Fft<f32>>,
    /// Pending convolution tails, per channel
    overlap: [Vec<f32>; 2],
    scratch: Vec<Complex<f32>>,
}

impl Convolver {
    /// Prepare a convolver for an interleaved stereo impulse response
    pub fn new(impulse: &[f32]) -> Result<Self> {
        if impulse.len() < 2 || impulse.len() % 2 != 0 {
            return Err(AudioError::InvalidBuffer(
                "impulse response must hold whole stereo frames".to_string(),
            ));
        }

        let ir_frames = impulse.len() / 2;
        let fft_size = (ir_frames + BLOCK_SIZE).next_power_of_two().max(MIN_FFT_SIZE);

        let mut planner = FftPlanner::new();
        let fft_forward = planner.plan_fft_forward(fft_size);
        let fft_inverse = planner.plan_fft_inverse(fft_size);

        let spectrum = |channel: usize| {
            let mut bins = vec![Complex::new(0.0f32, 0.0); fft_size];
            for (bin, frame) in bins.iter_mut().zip(impulse.chunks_exact(2)) {
                bin.re = frame[channel];
            }
            fft_forward.process(&mut bins);
            bins
        };
        let ir_spectra = [spectrum(0), spectrum(1)];

        Ok(Self {
            fft_size,
            block_size: fft_size - ir_frames + 1,
            ir_frames,
            ir_spectra,
            fft_forward,
            fft_inverse,
            overlap: [vec![0.0; fft_size], vec![0.0; fft_size]],
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
        })
    }

    /// Impulse response length in frames
    pub fn ir_frames(&self) -> usize {
        self.ir_frames
    }

    /// Convolve `frames` frames of one channel starting at frame `start`
    fn convolve_channel(&mut self, buffer: &[f32], start: usize, frames: usize, channel: usize) {
        for (i, bin) in self.scratch.iter_mut().enumerate() {
            *bin = if i < frames {
                Complex::new(buffer[(start + i) * 2 + channel], 0.0)
            } else {
                Complex::new(0.0, 0.0)
            };
        }

        self.fft_forward.process(&mut self.scratch);
        for (bin, ir) in self.scratch.iter_mut().zip(&self.ir_spectra[channel]) {
            *bin = *bin * *ir;
        }
        self.fft_inverse.process(&mut self.scratch);

        let scale = 1.0 / self.fft_size as f32;
        let conv_len = (frames + self.ir_frames - 1).min(self.fft_size);
        for (tail, bin) in self.overlap[channel][..conv_len].iter_mut().zip(&self.scratch) {
            *tail += bin.re * scale;
        }
    }

    /// Emit `frames` finished frames from the overlap buffers and shift them out
    fn drain_overlap(&mut self, output: &mut [f32], start: usize, frames: usize) {
        let block = &mut output[start * 2..(start + frames) * 2];
        for (channel, overlap) in self.overlap.iter_mut().enumerate() {
            for (frame, &sample) in block.chunks_exact_mut(2).zip(overlap.iter()) {
                frame[channel] = sample;
            }
            overlap.copy_within(frames.., 0);
            let len = overlap.len();
            overlap[len - frames..].fill(0.0);
        }
    }
}

impl AudioNode for Convolver {
    fn process(&mut self, buffer: &mut [f32]) {
        let total = buffer.len() / 2;
        let mut pos = 0;
        while pos < total {
            let frames = (total - pos).min(self.block_size);
            self.convolve_channel(buffer, pos, frames, 0);
            self.convolve_channel(buffer, pos, frames, 1);
            // Input frames of this block are no longer needed once convolved
            self.drain_overlap(buffer, pos, frames);
            pos += frames;
        }
    }

    fn reset(&mut self) {
        for overlap in &mut self.overlap {
            overlap.fill(0.0);
        }
    }

    fn name(&self) -> &str {
        "Convolution reverb"
    }
}
