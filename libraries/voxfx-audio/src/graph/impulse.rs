//! Procedural reverb impulse response
use rand::Rng;

/// Envelope exponent for the noise decay
const DECAY_EXPONENT: f32 = 2.5;

/// Synthesize a stereo impulse response `seconds` long
///
/// Each sample is independent uniform noise in [-1, 1) shaped by
/// `((length - i) / length)^2.5`, so the tail decays to silence. Output is
/// interleaved stereo; the two channels draw separate noise.
pub fn build_reverb_impulse<R: Rng + ?Sized>(
    sample_rate: u32,
    seconds: f64,
    rng: &mut R,
) -> Vec<f32> {
    let length = (f64::from(sample_rate) * seconds).round() as usize;
    let mut impulse = Vec::with_capacity(length * 2);

    for i in 0..length {
        let envelope = ((length - i) as f32 / length as f32).powf(DECAY_EXPONENT);
        for _ in 0..2 {
            let noise = rng.gen::<f32>() * 2.0 - 1.0;
            impulse.push(noise * envelope);
        }
    }

    impulse
}

/// Scale a stereo impulse to unit energy per channel
///
/// Keeps the wet path roughly as loud as the dry path regardless of impulse
/// length. Silent impulses are left alone.
pub fn normalize_impulse(impulse: &mut [f32]) {
    let energy: f32 = impulse.iter().map(|s| s * s).sum::<f32>() / 2.0;
    if energy <= f32::EPSILON {
        return;
    }
    let scale = 1.0 / energy.sqrt();
    for sample in impulse.iter_mut() {
        *sample *= scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_length_is_two_channels_of_duration() {
        let mut rng = StdRng::seed_from_u64(7);
        let ir = build_reverb_impulse(8000, 2.0, &mut rng);
        assert_eq!(ir.len(), 16_000 * 2);
    }

    #[test]
    fn test_samples_stay_inside_envelope() {
        let mut rng = StdRng::seed_from_u64(11);
        let length = 4000;
        let ir = build_reverb_impulse(2000, 2.0, &mut rng);
        for (n, sample) in ir.iter().enumerate() {
            let i = n / 2;
            let envelope = ((length - i) as f32 / length as f32).powf(2.5);
            assert!(sample.abs() <= envelope + 1e-6, "sample {} exceeds envelope", n);
        }
    }

    #[test]
    fn test_tail_decays() {
        let mut rng = StdRng::seed_from_u64(3);
        let ir = build_reverb_impulse(8000, 2.0, &mut rng);
        let head: f32 = ir[..2000].iter().map(|s| s.abs()).sum();
        let tail: f32 = ir[ir.len() - 2000..].iter().map(|s| s.abs()).sum();
        assert!(tail < head * 0.01);
    }

    #[test]
    fn test_normalize_gives_unit_energy() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut ir = build_reverb_impulse(4000, 1.0, &mut rng);
        normalize_impulse(&mut ir);
        let energy: f32 = ir.iter().map(|s| s * s).sum::<f32>() / 2.0;
        assert!((energy - 1.0).abs() < 1e-3);

        let mut silent = vec![0.0; 8];
        normalize_impulse(&mut silent);
        assert!(silent.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_channels_are_not_identical() {
        let mut rng = StdRng::seed_from_u64(5);
        let ir = build_reverb_impulse(1000, 0.5, &mut rng);
        let differing = ir.chunks_exact(2).filter(|f| f[0] != f[1]).count();
        assert!(differing > 400);
    }
}
