//! Delay line with a feedback self-loop
//!
//! The node outputs only the delayed signal. Each delayed frame is fed back
//! into the line scaled by the feedback gain, which produces the repeating
//! echoes. Mixing the output into the master bus is the graph's job.

use super::AudioNode;

pub struct FeedbackDelay {
    sample_rate: u32,
    /// Ring buffers, one per channel, `max_frames + 1` long
    lines: [Vec<f32>; 2],
    write_pos: usize,
    max_seconds: f64,
    delay_seconds: f64,
    delay_frames: usize,
    feedback: f64,
}

impl FeedbackDelay {
    pub fn new(sample_rate: u32, max_seconds: f64) -> Self {
        let max_frames = (max_seconds * f64::from(sample_rate)).ceil().max(1.0) as usize;
        Self {
            sample_rate,
            lines: [vec![0.0; max_frames + 1], vec![0.0; max_frames + 1]],
            write_pos: 0,
            max_seconds,
            delay_seconds: 0.0,
            delay_frames: 1,
            feedback: 0.0,
        }
    }

    /// Set the delay length, bounded to the line's maximum
    ///
    /// Returns the length actually applied.
    pub fn set_delay_time(&mut self, seconds: f64) -> f64 {
        let seconds = seconds.clamp(0.0, self.max_seconds);
        self.delay_seconds = seconds;
        let max_frames = self.lines[0].len() - 1;
        // A zero-length loop cannot exist; one frame is the floor
        self.delay_frames = ((seconds * f64::from(self.sample_rate)).round() as usize)
            .clamp(1, max_frames);
        seconds
    }

    pub fn set_feedback(&mut self, gain: f64) {
        self.feedback = gain;
    }

    pub fn delay_time(&self) -> f64 {
        self.delay_seconds
    }

    pub fn delay_frames(&self) -> usize {
        self.delay_frames
    }

    pub fn feedback(&self) -> f64 {
        self.feedback
    }

    pub fn max_delay_time(&self) -> f64 {
        self.max_seconds
    }
}

impl AudioNode for FeedbackDelay {
    fn process(&mut self, buffer: &mut [f32]) {
        let len = self.lines[0].len();
        let feedback = self.feedback as f32;
        for frame in buffer.chunks_exact_mut(2) {
            let read_pos = (self.write_pos + len - self.delay_frames) % len;
            for (ch, sample) in frame.iter_mut().enumerate() {
                let line = &mut self.lines[ch];
                let delayed = line[read_pos];
                line[self.write_pos] = *sample + delayed * feedback;
                *sample = delayed;
            }
            self.write_pos = (self.write_pos + 1) % len;
        }
    }

    fn reset(&mut self) {
        for line in &mut self.lines {
            line.fill(0.0);
        }
        self.write_pos = 0;
    }

    fn name(&self) -> &str {
        "Delay"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impulse(frames: usize) -> Vec<f32> {
        let mut buffer = vec![0.0; frames * 2];
        buffer[0] = 1.0;
        buffer[1] = 1.0;
        buffer
    }

    #[test]
    fn test_echo_lands_at_delay_time() {
        let mut delay = FeedbackDelay::new(1000, 1.0);
        delay.set_delay_time(0.1);
        delay.set_feedback(0.0);

        let mut buffer = impulse(300);
        delay.process(&mut buffer);

        assert_eq!(buffer[0], 0.0);
        assert_eq!(buffer[100 * 2], 1.0);
        assert_eq!(buffer[200 * 2], 0.0);
    }

    #[test]
    fn test_feedback_repeats_with_decay() {
        let mut delay = FeedbackDelay::new(1000, 1.0);
        delay.set_delay_time(0.05);
        delay.set_feedback(0.5);

        let mut buffer = impulse(200);
        delay.process(&mut buffer);

        assert!((buffer[50 * 2] - 1.0).abs() < 1e-6);
        assert!((buffer[100 * 2] - 0.5).abs() < 1e-6);
        assert!((buffer[150 * 2 + 1] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_delay_time_is_bounded_by_line() {
        let mut delay = FeedbackDelay::new(1000, 5.0);
        assert_eq!(delay.set_delay_time(7.0), 5.0);
        assert_eq!(delay.delay_frames(), 5000);
        assert_eq!(delay.set_delay_time(0.0), 0.0);
        assert_eq!(delay.delay_frames(), 1);
    }

    #[test]
    fn test_echo_spans_block_boundaries() {
        let mut delay = FeedbackDelay::new(1000, 1.0);
        delay.set_delay_time(0.1);

        let mut first = impulse(64);
        delay.process(&mut first);
        let mut second = vec![0.0; 64 * 2];
        delay.process(&mut second);

        assert_eq!(second[(100 - 64) * 2], 1.0);
    }

    #[test]
    fn test_reset_clears_pending_echoes() {
        let mut delay = FeedbackDelay::new(1000, 1.0);
        delay.set_delay_time(0.1);
        let mut buffer = impulse(50);
        delay.process(&mut buffer);
        delay.reset();

        let mut tail = vec![0.0; 200 * 2];
        delay.process(&mut tail);
        assert!(tail.iter().all(|&s| s == 0.0));
    }
}
