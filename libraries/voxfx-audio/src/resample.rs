//! Sample-rate conversion of whole decoded buffers
use crate::buffer::{AudioBuffer, CHANNELS};
use crate::error::{AudioError, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler};

/// Frames handed to the resampler per call
const CHUNK_SIZE: usize = 1024;

/// Resample a whole buffer to `target_rate`
///
/// Linear interpolation; the resampler's output delay is trimmed so the
/// result lines up with the input and has the same duration.
pub fn resample(buffer: &AudioBuffer, target_rate: u32) -> Result<AudioBuffer> {
    if target_rate == 0 {
        return Err(AudioError::Resample("target rate is zero".to_string()));
    }
    if buffer.sample_rate() == target_rate || buffer.is_empty() {
        return AudioBuffer::new(buffer.samples().to_vec(), target_rate);
    }

    let ratio = f64::from(target_rate) / f64::from(buffer.sample_rate());
    let mut resampler =
        FastFixedIn::<f32>::new(ratio, 1.0, PolynomialDegree::Linear, CHUNK_SIZE, CHANNELS)
            .map_err(|e| AudioError::Resample(format!("FastFixedIn creation failed: {}", e)))?;

    let frames = buffer.frames();
    let planar: Vec<Vec<f32>> = (0..CHANNELS)
        .map(|ch| buffer.samples().iter().skip(ch).step_by(CHANNELS).copied().collect())
        .collect();

    let delay = resampler.output_delay();
    let expected = (frames as f64 * ratio).round() as usize;
    let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(expected + delay); CHANNELS];

    let mut pos = 0;
    while pos < frames {
        let needed = resampler.input_frames_next();
        let end = (pos + needed).min(frames);
        let chunk: Vec<&[f32]> = planar.iter().map(|c| &c[pos..end]).collect();
        let processed = (if end - pos == needed {
            resampler.process(&chunk, None)
        } else {
            resampler.process_partial(Some(chunk.as_slice()), None)
        })
        .map_err(|e| AudioError::Resample(e.to_string()))?;
        append(&mut output, processed);
        pos = end;
    }

    // Flush whatever the resampler still holds back
    while output[0].len() < expected + delay {
        let processed = resampler
            .process_partial(None::<&[Vec<f32>]>, None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        if processed[0].is_empty() {
            break;
        }
        append(&mut output, processed);
    }

    let available = output[0].len().saturating_sub(delay).min(expected);
    let samples: Vec<f32> = (delay..delay + available)
        .flat_map(|i| output.iter().map(move |channel| channel[i]))
        .collect();

    AudioBuffer::new(samples, target_rate)
}

fn append(output: &mut [Vec<f32>], processed: Vec<Vec<f32>>) {
    for (out, chunk) in output.iter_mut().zip(processed) {
        out.extend(chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsample_doubles_frames() {
        let input = AudioBuffer::from_mono(&vec![0.25; 4000], 8000).unwrap();
        let output = resample(&input, 16000).unwrap();
        assert_eq!(output.sample_rate(), 16000);
        assert!((output.frames() as i64 - 8000).abs() <= 2);
    }

    #[test]
    fn test_constant_signal_stays_constant() {
        let input = AudioBuffer::from_mono(&vec![0.5; 4000], 8000).unwrap();
        let output = resample(&input, 11025).unwrap();
        let middle = &output.samples()[200..output.samples().len() - 200];
        assert!(middle.iter().all(|s| (s - 0.5).abs() < 1e-3));
    }

    #[test]
    fn test_same_rate_is_a_copy() {
        let input = AudioBuffer::from_mono(&[0.1, 0.2, 0.3], 8000).unwrap();
        assert_eq!(resample(&input, 8000).unwrap(), input);
    }
}
