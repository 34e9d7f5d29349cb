//! Fixed-topology effect graph
//!
//! ```text
//!                        ┌──── dry gain ─────────────────────┐
//! input ── low-pass ─────┼── reverb ── reverb wet gain ──────┼── master ── output
//!                        └── delay ─┬─ delay wet gain ───────┘
//!                           ▲       │
//!                           └─ feedback gain
//! ```
//!
//! The topology is built once and never rewired. Only the scalar parameters
//! of the nodes change, through [`EffectGraph::set_effect`] for catalog
//! effects and [`EffectGraph::set_master_gain`] for output volume.

mod convolution;
mod delay;
mod impulse;
mod lowpass;
mod node;

pub use convolution::Convolver;
pub use delay::FeedbackDelay;
pub use impulse::{build_reverb_impulse, normalize_impulse};
pub use lowpass::LowPassFilter;
pub use node::AudioNode;

use crate::error::{AudioError, Result};
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info, warn};
use voxfx_core::{ParameterCatalog, PLAYBACK_EFFECT_ID};

/// Cutoff the filter starts at before catalog defaults are applied
const INITIAL_CUTOFF_HZ: f64 = 20_000.0;

/// Construction parameters for [`EffectGraph`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphConfig {
    /// Engine sample rate in Hz
    pub sample_rate: u32,
    /// Length of the delay line
    pub max_delay_seconds: f64,
    /// Length of the synthesized reverb impulse
    pub impulse_seconds: f64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            max_delay_seconds: 5.0,
            impulse_seconds: 2.0,
        }
    }
}

/// Catalog parameters that have a node in the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GraphParameter {
    ReverbMix,
    DelayTime,
    DelayFeedback,
    FilterFrequency,
}

impl GraphParameter {
    fn resolve(effect_id: &str, param_id: &str) -> Option<Self> {
        match (effect_id, param_id) {
            ("reverb", "mix") => Some(Self::ReverbMix),
            ("delay", "time") => Some(Self::DelayTime),
            ("delay", "feedback") => Some(Self::DelayFeedback),
            ("filter", "frequency") => Some(Self::FilterFrequency),
            _ => None,
        }
    }
}

/// The live processing graph
pub struct EffectGraph {
    catalog: Arc<ParameterCatalog>,
    config: GraphConfig,
    lowpass: LowPassFilter,
    reverb: Convolver,
    delay: FeedbackDelay,
    dry_gain: f64,
    reverb_wet_gain: f64,
    delay_wet_gain: f64,
    master_gain: f64,
    /// Per-block copies of the filtered signal for the parallel paths
    reverb_bus: Vec<f32>,
    delay_bus: Vec<f32>,
}

impl EffectGraph {
    /// Build the graph with a freshly seeded impulse response
    pub fn build(catalog: Arc<ParameterCatalog>, config: GraphConfig) -> Result<Self> {
        Self::build_with_rng(catalog, config, &mut rand::thread_rng())
    }

    /// Build the graph drawing impulse noise from `rng`
    ///
    /// Catalog defaults for every effect parameter are applied before the
    /// graph is returned.
    pub fn build_with_rng<R: Rng + ?Sized>(
        catalog: Arc<ParameterCatalog>,
        config: GraphConfig,
        rng: &mut R,
    ) -> Result<Self> {
        if config.sample_rate == 0 {
            return Err(AudioError::InvalidBuffer("sample rate is zero".to_string()));
        }
        if let Some(time) = catalog.parameter("delay", "time") {
            // Every accepted delay time must fit the line
            if time.max > config.max_delay_seconds {
                return Err(AudioError::DelayLineTooShort {
                    requested: time.max,
                    available: config.max_delay_seconds,
                });
            }
        }

        let mut impulse = build_reverb_impulse(config.sample_rate, config.impulse_seconds, rng);
        normalize_impulse(&mut impulse);
        let reverb = Convolver::new(&impulse)?;
        let lowpass = LowPassFilter::new(config.sample_rate, INITIAL_CUTOFF_HZ).ok_or_else(|| {
            AudioError::InvalidBuffer(format!(
                "no low-pass coefficients at {} Hz",
                config.sample_rate
            ))
        })?;

        let mut graph = Self {
            catalog,
            config,
            lowpass,
            reverb,
            delay: FeedbackDelay::new(config.sample_rate, config.max_delay_seconds),
            dry_gain: 1.0,
            reverb_wet_gain: 0.0,
            delay_wet_gain: 0.0,
            master_gain: 1.0,
            reverb_bus: Vec::new(),
            delay_bus: Vec::new(),
        };
        graph.apply_catalog_defaults();

        info!(
            "Effect graph built at {} Hz ({} frame impulse, {:.1}s delay line)",
            config.sample_rate,
            graph.reverb.ir_frames(),
            config.max_delay_seconds
        );
        Ok(graph)
    }

    fn apply_catalog_defaults(&mut self) {
        let catalog = Arc::clone(&self.catalog);
        for (effect_id, descriptor) in catalog.parameters() {
            if effect_id == PLAYBACK_EFFECT_ID {
                continue;
            }
            match self.set_effect(effect_id, &descriptor.key, descriptor.default_value) {
                Ok(shown) => debug!("Default {}.{} = {}", effect_id, descriptor.key, shown),
                Err(e) => warn!("Skipping catalog default: {}", e),
            }
        }
    }

    /// Apply a catalog parameter to its node(s)
    ///
    /// Values outside the descriptor's range are rejected, never clamped.
    /// Returns the unit-formatted value for display.
    pub fn set_effect(&mut self, effect_id: &str, param_id: &str, value: f64) -> Result<String> {
        let target = GraphParameter::resolve(effect_id, param_id)
            .ok_or_else(|| AudioError::unknown_effect(effect_id, param_id))?;
        let descriptor = self
            .catalog
            .parameter(effect_id, param_id)
            .ok_or_else(|| AudioError::unknown_effect(effect_id, param_id))?;

        if !descriptor.contains(value) {
            return Err(AudioError::InvalidParameter {
                effect: effect_id.to_string(),
                parameter: param_id.to_string(),
                value,
                min: descriptor.min,
                max: descriptor.max,
            });
        }
        let shown = descriptor.format(value);

        match target {
            GraphParameter::ReverbMix => {
                self.reverb_wet_gain = value;
                self.dry_gain = 1.0 - value;
            }
            GraphParameter::DelayTime => {
                self.delay.set_delay_time(value);
            }
            GraphParameter::DelayFeedback => {
                // Feedback amount doubles as the echo output level
                self.delay.set_feedback(value);
                self.delay_wet_gain = value;
            }
            GraphParameter::FilterFrequency => self.lowpass.set_cutoff(value),
        }

        debug!("{}.{} -> {}", effect_id, param_id, shown);
        Ok(shown)
    }

    /// Current value of a catalog parameter as applied to the graph
    pub fn parameter_value(&self, effect_id: &str, param_id: &str) -> Option<f64> {
        GraphParameter::resolve(effect_id, param_id).map(|target| match target {
            GraphParameter::ReverbMix => self.reverb_wet_gain,
            GraphParameter::DelayTime => self.delay.delay_time(),
            GraphParameter::DelayFeedback => self.delay.feedback(),
            GraphParameter::FilterFrequency => self.lowpass.cutoff(),
        })
    }

    /// Output gain; range checks belong to the caller
    pub fn set_master_gain(&mut self, gain: f64) {
        self.master_gain = gain;
    }

    pub fn master_gain(&self) -> f64 {
        self.master_gain
    }

    pub fn dry_gain(&self) -> f64 {
        self.dry_gain
    }

    pub fn reverb_wet_gain(&self) -> f64 {
        self.reverb_wet_gain
    }

    pub fn delay_wet_gain(&self) -> f64 {
        self.delay_wet_gain
    }

    pub fn delay_feedback_gain(&self) -> f64 {
        self.delay.feedback()
    }

    pub fn delay_time(&self) -> f64 {
        self.delay.delay_time()
    }

    pub fn filter_cutoff(&self) -> f64 {
        self.lowpass.cutoff()
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<ParameterCatalog> {
        &self.catalog
    }

    /// Run one block of interleaved stereo input through the graph in place
    pub fn process(&mut self, buffer: &mut [f32]) {
        self.lowpass.process(buffer);

        self.reverb_bus.clear();
        self.reverb_bus.extend_from_slice(buffer);
        self.delay_bus.clear();
        self.delay_bus.extend_from_slice(buffer);

        self.reverb.process(&mut self.reverb_bus);
        self.delay.process(&mut self.delay_bus);

        let dry = self.dry_gain as f32;
        let reverb_wet = self.reverb_wet_gain as f32;
        let delay_wet = self.delay_wet_gain as f32;
        let master = self.master_gain as f32;

        for ((out, reverb), delay) in buffer
            .iter_mut()
            .zip(&self.reverb_bus)
            .zip(&self.delay_bus)
        {
            *out = master * (dry * *out + reverb_wet * reverb + delay_wet * delay);
        }
    }

    /// Clear filter memory, delay lines and reverb tails
    pub fn reset(&mut self) {
        self.lowpass.reset();
        self.reverb.reset();
        self.delay.reset();
    }
}
