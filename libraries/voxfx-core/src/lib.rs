//! voxfx core
//!
//! Shared vocabulary for the voxfx engine crates: the parameter catalog that
//! describes every adjustable effect and transport property, and the unit
//! rules that turn raw values into display strings.
//!
//! # Example
//!
//! ```
//! use voxfx_core::ParameterCatalog;
//!
//! let catalog = ParameterCatalog::bundled().unwrap();
//! let cutoff = catalog.parameter("filter", "frequency").unwrap();
//! assert_eq!(cutoff.format(cutoff.default_value), "20.0kHz");
//! ```

#![forbid(unsafe_code)]

pub mod catalog;
pub mod error;
pub mod units;

pub use catalog::{EffectDescriptor, ParameterCatalog, ParameterDescriptor, PLAYBACK_EFFECT_ID};
pub use error::{CoreError, Result};
pub use units::Unit;
