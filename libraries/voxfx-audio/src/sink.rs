//! Destinations for rendered audio
//!
//! The live engine hands every block it renders to an [`AudioSink`]. A
//! sink sees interleaved stereo f32 at the engine rate.

use crate::error::Result;
use std::sync::{Arc, Mutex, PoisonError};

/// Receiver of rendered blocks
pub trait AudioSink: Send {
    fn write(&mut self, block: &[f32]) -> Result<()>;

    /// Flush and close; no blocks follow
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Sink that keeps every sample in memory
///
/// Clones share the same storage, so a clone kept outside the engine can
/// inspect what was rendered.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    samples: Arc<Mutex<Vec<f32>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far
    pub fn samples(&self) -> Vec<f32> {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AudioSink for MemorySink {
    fn write(&mut self, block: &[f32]) -> Result<()> {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(block);
        Ok(())
    }
}
