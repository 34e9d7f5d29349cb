//! Processing node trait shared by every stage of the effect graph

/// A single stage of the fixed effect graph
///
/// Nodes process interleaved stereo buffers in place. Parameter changes go
/// through the node's own setters; the graph decides which node a catalog
/// parameter lands on.
pub trait AudioNode: Send {
    /// Process one block of interleaved stereo samples in place
    fn process(&mut self, buffer: &mut [f32]);

    /// Clear internal state (filter memory, delay lines, convolution tails)
    fn reset(&mut self);

    /// Node name for logging
    fn name(&self) -> &str;
}
