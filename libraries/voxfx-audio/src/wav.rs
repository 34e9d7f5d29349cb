//! WAV output for rendered audio
use crate::buffer::{AudioBuffer, CHANNELS};
use crate::error::{AudioError, Result};
use crate::sink::AudioSink;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

fn float_spec(sample_rate: u32) -> hound::WavSpec {
    hound::WavSpec {
        channels: CHANNELS as u16,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    }
}

/// Write a buffer as 32-bit float stereo WAV
pub fn write_wav(path: &Path, buffer: &AudioBuffer) -> Result<()> {
    let mut writer = hound::WavWriter::create(path, float_spec(buffer.sample_rate()))?;
    for &sample in buffer.samples() {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    info!(
        "Wrote {} ({:.2}s)",
        path.display(),
        buffer.duration_secs()
    );
    Ok(())
}

/// Sink streaming blocks into a 32-bit float stereo WAV file
pub struct WavSink {
    path: PathBuf,
    sample_rate: u32,
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    samples: usize,
}

impl WavSink {
    pub fn create(path: &Path, sample_rate: u32) -> Result<Self> {
        let writer = hound::WavWriter::create(path, float_spec(sample_rate))?;
        Ok(Self {
            path: path.to_path_buf(),
            sample_rate,
            writer: Some(writer),
            samples: 0,
        })
    }
}

impl AudioSink for WavSink {
    fn write(&mut self, block: &[f32]) -> Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            AudioError::InvalidBuffer(format!("{} is already finished", self.path.display()))
        })?;
        for &sample in block {
            writer.write_sample(sample)?;
        }
        self.samples += block.len();
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
            let seconds = (self.samples / CHANNELS) as f64 / f64::from(self.sample_rate);
            info!("Recorded {} ({:.2}s)", self.path.display(), seconds);
        }
        Ok(())
    }
}
