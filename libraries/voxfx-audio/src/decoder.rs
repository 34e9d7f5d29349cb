//! Audio file decoding using Symphonia
use crate::buffer::AudioBuffer;
use crate::error::{AudioError, Result};
use crate::resample::resample;
use std::path::Path;
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, info, warn};

/// Whole-file decoder
///
/// Supports: MP3, FLAC, OGG, WAV, AAC. Output is always interleaved stereo f32;
/// mono is duplicated and extra channels beyond the first two are dropped.
#[derive(Debug, Default)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode a file and resample it to `target_rate` if needed
    pub fn decode_to_rate(&self, path: &Path, target_rate: u32) -> Result<AudioBuffer> {
        let buffer = self.decode(path)?;
        if buffer.sample_rate() == target_rate {
            return Ok(buffer);
        }
        debug!(
            "Resampling {} from {} Hz to {} Hz",
            path.display(),
            buffer.sample_rate(),
            target_rate
        );
        resample(&buffer, target_rate)
    }

    /// Decode the default track of a file at its native rate
    pub fn decode(&self, path: &Path) -> Result<AudioBuffer> {
        if !path.exists() {
            return Err(AudioError::FileNotFound(path.display().to_string()));
        }

        let file = std::fs::File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Hint the format registry with the extension
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| AudioError::UnsupportedFormat(format!("{}: {}", path.display(), e)))?;

        let mut format = probed.format;

        let track = format
            .default_track()
            .ok_or_else(|| AudioError::DecodeError("No audio tracks found".to_string()))?;

        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| AudioError::DecodeError("Track has no sample rate".to_string()))?;
        let track_id = track.id;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| AudioError::Symphonia(format!("Failed to create decoder: {}", e)))?;

        let mut samples = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(e) => {
                    return Err(AudioError::Symphonia(format!(
                        "Error reading packet: {}",
                        e
                    )));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => append_stereo(decoded, &mut samples),
                // Corrupt packets are skipped, the rest of the stream is still usable
                Err(SymphoniaError::DecodeError(e)) => warn!("Skipping undecodable packet: {}", e),
                Err(e) => return Err(AudioError::DecodeError(e.to_string())),
            }
        }

        let buffer = AudioBuffer::new(samples, sample_rate)?;
        if buffer.is_empty() {
            return Err(AudioError::DecodeError(format!(
                "{} contains no audio",
                path.display()
            )));
        }

        info!(
            "Decoded {} ({:.2}s at {} Hz)",
            path.display(),
            buffer.duration_secs(),
            sample_rate
        );
        Ok(buffer)
    }
}

/// Convert a decoded packet to f32 and append it as interleaved stereo
fn append_stereo(decoded: AudioBufferRef, out: &mut Vec<f32>) {
    match decoded {
        AudioBufferRef::F32(buf) => push_frames(&buf, out, |s| s.clamp(-1.0, 1.0)),
        AudioBufferRef::F64(buf) => push_frames(&buf, out, |s| (s as f32).clamp(-1.0, 1.0)),
        AudioBufferRef::S32(buf) => push_frames(&buf, out, |s| s as f32 / 2147483648.0),
        AudioBufferRef::S24(buf) => push_frames(&buf, out, |s| s.inner() as f32 / 8388608.0),
        AudioBufferRef::S16(buf) => push_frames(&buf, out, |s| s as f32 / 32768.0),
        AudioBufferRef::S8(buf) => push_frames(&buf, out, |s| s as f32 / 128.0),
        AudioBufferRef::U32(buf) => {
            push_frames(&buf, out, |s| (s as f32 / u32::MAX as f32) * 2.0 - 1.0);
        }
        AudioBufferRef::U24(buf) => {
            push_frames(&buf, out, |s| (s.inner() as f32 / 16777215.0) * 2.0 - 1.0);
        }
        AudioBufferRef::U16(buf) => {
            push_frames(&buf, out, |s| (s as f32 / u16::MAX as f32) * 2.0 - 1.0);
        }
        AudioBufferRef::U8(buf) => {
            push_frames(&buf, out, |s| (s as f32 / u8::MAX as f32) * 2.0 - 1.0);
        }
    }
}

fn push_frames<T, F>(buf: &symphonia::core::audio::AudioBuffer<T>, out: &mut Vec<f32>, normalize: F)
where
    T: symphonia::core::sample::Sample + Copy,
    F: Fn(T) -> f32,
{
    let frames = buf.frames();
    let channels = buf.spec().channels.count();
    out.reserve(frames * 2);

    match channels {
        0 => out.resize(out.len() + frames * 2, 0.0),
        1 => {
            for &s in buf.chan(0) {
                let s = normalize(s);
                out.push(s);
                out.push(s);
            }
        }
        _ => {
            for (&l, &r) in buf.chan(0).iter().zip(buf.chan(1)) {
                out.push(normalize(l));
                out.push(normalize(r));
            }
        }
    }
}
