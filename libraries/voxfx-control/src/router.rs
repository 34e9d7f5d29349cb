//! Parameter router
//!
//! The only entry point for raw numeric input. Effect parameters go to the
//! graph, playback properties go to the master gain (`volume`) or the
//! transport's rate (`speed`). Every accepted value comes back as its
//! unit-formatted display string.

use crate::error::{ControlError, Result};
use std::sync::Arc;
use tracing::{debug, warn};
use voxfx_audio::EffectGraph;
use voxfx_core::{ParameterCatalog, PLAYBACK_EFFECT_ID};
use voxfx_playback::TransportController;

pub const VOLUME: &str = "volume";
pub const SPEED: &str = "speed";

/// One parameter echo: effect id, parameter id and display value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterEcho {
    pub effect: String,
    pub parameter: String,
    pub display: String,
}

/// Catalog-checked access to the graph and transport parameters
#[derive(Debug, Clone)]
pub struct ParameterRouter {
    catalog: Arc<ParameterCatalog>,
}

impl ParameterRouter {
    pub fn new(catalog: Arc<ParameterCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Arc<ParameterCatalog> {
        &self.catalog
    }

    /// Set an effect parameter on the graph
    ///
    /// Fails with `UnknownParameter` when the catalog has no descriptor for
    /// the pair; the graph rejects out-of-range values itself.
    pub fn set_effect_parameter(
        &self,
        graph: &mut EffectGraph,
        effect_id: &str,
        param_id: &str,
        value: f64,
    ) -> Result<String> {
        if effect_id == PLAYBACK_EFFECT_ID || self.catalog.parameter(effect_id, param_id).is_none() {
            return Err(ControlError::unknown_parameter(effect_id, param_id));
        }
        Ok(graph.set_effect(effect_id, param_id, value)?)
    }

    /// Set `volume` or `speed`
    pub fn set_playback_property(
        &self,
        graph: &mut EffectGraph,
        transport: &mut TransportController,
        property: &str,
        value: f64,
    ) -> Result<String> {
        let descriptor = self
            .catalog
            .playback_property(property)
            .filter(|_| property == VOLUME || property == SPEED)
            .ok_or_else(|| ControlError::unknown_parameter(PLAYBACK_EFFECT_ID, property))?;

        if !descriptor.contains(value) {
            return Err(ControlError::InvalidParameter {
                effect: PLAYBACK_EFFECT_ID.to_string(),
                parameter: property.to_string(),
                value,
                min: descriptor.min,
                max: descriptor.max,
            });
        }

        if property == SPEED {
            transport.set_playback_rate(value)?;
        } else {
            graph.set_master_gain(value);
        }

        let shown = descriptor.format(value);
        debug!("playback.{} -> {}", property, shown);
        Ok(shown)
    }

    /// Route every catalog default the graph and transport can take
    ///
    /// Pairs without a target are skipped with a warning, the same way the
    /// graph treats them at build time. Everything is checked before the
    /// first value is applied, so a failure leaves the state untouched.
    /// Returns one echo per parameter applied.
    pub fn apply_defaults(
        &self,
        graph: &mut EffectGraph,
        transport: &mut TransportController,
    ) -> Result<Vec<ParameterEcho>> {
        let catalog = Arc::clone(&self.catalog);
        let mut planned = Vec::new();

        for (effect_id, descriptor) in catalog.parameters() {
            if !self.has_target(graph, effect_id, &descriptor.key) {
                warn!("Skipping default for {}.{}: no target", effect_id, descriptor.key);
                continue;
            }
            let value = descriptor.default_value;
            if effect_id == PLAYBACK_EFFECT_ID && descriptor.key == SPEED && value <= 0.0 {
                return Err(ControlError::InvalidParameter {
                    effect: effect_id.to_string(),
                    parameter: descriptor.key.clone(),
                    value,
                    min: descriptor.min,
                    max: descriptor.max,
                });
            }
            planned.push((effect_id, descriptor));
        }

        let mut echoes = Vec::with_capacity(planned.len());
        for (effect_id, descriptor) in planned {
            let value = descriptor.default_value;
            let display = if effect_id == PLAYBACK_EFFECT_ID {
                self.set_playback_property(graph, transport, &descriptor.key, value)?
            } else {
                self.set_effect_parameter(graph, effect_id, &descriptor.key, value)?
            };
            echoes.push(ParameterEcho {
                effect: effect_id.to_string(),
                parameter: descriptor.key.clone(),
                display,
            });
        }

        Ok(echoes)
    }

    fn has_target(&self, graph: &EffectGraph, effect_id: &str, param_id: &str) -> bool {
        if effect_id == PLAYBACK_EFFECT_ID {
            param_id == VOLUME || param_id == SPEED
        } else {
            graph.parameter_value(effect_id, param_id).is_some()
        }
    }

    /// Value currently applied for a parameter, if it has a target
    pub fn current_value(
        &self,
        graph: &EffectGraph,
        transport: &TransportController,
        effect_id: &str,
        param_id: &str,
    ) -> Option<f64> {
        match (effect_id, param_id) {
            (PLAYBACK_EFFECT_ID, VOLUME) => Some(graph.master_gain()),
            (PLAYBACK_EFFECT_ID, SPEED) => Some(transport.playback_rate()),
            (PLAYBACK_EFFECT_ID, _) => None,
            _ => graph.parameter_value(effect_id, param_id),
        }
    }
}
