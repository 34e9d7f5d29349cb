//! voxfx audio
//!
//! The signal side of voxfx: a fixed effect graph (low-pass filter feeding a
//! dry path, a convolution reverb and a feedback delay, summed into a master
//! gain), the procedural impulse response the reverb convolves with, and
//! decoding of audio files into the in-memory buffers the transport plays.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use voxfx_audio::{EffectGraph, GraphConfig};
//! use voxfx_core::ParameterCatalog;
//!
//! let catalog = Arc::new(ParameterCatalog::bundled().unwrap());
//! let mut graph = EffectGraph::build(catalog, GraphConfig::default()).unwrap();
//!
//! assert_eq!(graph.set_effect("delay", "time", 0.25).unwrap(), "250ms");
//!
//! let mut block = vec![0.0f32; 2048];
//! graph.process(&mut block);
//! ```

#![forbid(unsafe_code)]

pub mod buffer;
pub mod decoder;
pub mod error;
pub mod graph;
pub mod resample;
pub mod sink;
pub mod wav;

pub use buffer::{AudioBuffer, CHANNELS};
pub use decoder::SymphoniaDecoder;
pub use error::{AudioError, Result};
pub use graph::{build_reverb_impulse, AudioNode, EffectGraph, GraphConfig};
pub use resample::resample;
pub use sink::{AudioSink, MemorySink};
pub use wav::{write_wav, WavSink};
