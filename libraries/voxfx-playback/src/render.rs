//! Block rendering through the effect graph
//!
//! Glue between the live playback unit and the graph's input node. Used by
//! offline rendering, where a [`ManualClock`](crate::ManualClock) is advanced
//! by exactly the audio time each block covers so the transport's
//! wall-clock accounting lines up with the rendered output.

use crate::clock::ManualClock;
use crate::transport::TransportController;
use std::time::Duration;
use voxfx_audio::{EffectGraph, CHANNELS};

/// Pull one block from the transport and run it through the graph
///
/// The graph keeps running after playback stops so reverb and delay tails
/// ring out.
pub fn render_block(transport: &mut TransportController, graph: &mut EffectGraph, out: &mut [f32]) {
    transport.pull(out);
    graph.process(out);
}

/// Drives a transport and graph block by block against a manual clock
pub struct BlockRenderer {
    clock: ManualClock,
    block_frames: usize,
    sample_rate: u32,
    frames_since_tick: usize,
    frames_per_tick: usize,
}

impl BlockRenderer {
    /// `clock` must be the clock the transport was built with
    pub fn new(clock: ManualClock, sample_rate: u32, block_frames: usize, tick: Duration) -> Self {
        let frames_per_tick =
            ((tick.as_secs_f64() * f64::from(sample_rate)).round() as usize).max(1);
        Self {
            clock,
            block_frames: block_frames.max(1),
            sample_rate,
            frames_since_tick: 0,
            frames_per_tick,
        }
    }

    /// Render one block, advance the clock by its length, and fire a
    /// progress tick whenever a tick period has elapsed
    pub fn render(&mut self, transport: &mut TransportController, graph: &mut EffectGraph) -> Vec<f32> {
        let mut block = vec![0.0; self.block_frames * CHANNELS];
        render_block(transport, graph, &mut block);

        self.clock.advance(Duration::from_secs_f64(
            self.block_frames as f64 / f64::from(self.sample_rate),
        ));
        self.frames_since_tick += self.block_frames;
        while self.frames_since_tick >= self.frames_per_tick {
            self.frames_since_tick -= self.frames_per_tick;
            transport.tick();
        }

        block
    }

    pub fn block_frames(&self) -> usize {
        self.block_frames
    }
}
