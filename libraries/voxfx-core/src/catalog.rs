//! Parameter catalog
//!
//! The catalog is the static description of every effect and playback
//! property a control surface may touch. It is loaded once from JSON of the
//! shape
//!
//! ```json
//! { "reverb": { "name": "Reverb", "parameters": {
//!     "mix": { "label": "Wet/Dry", "min": 0, "max": 1, "step": 0.01,
//!              "defaultValue": 0.3, "unit": "percentage" } } } }
//! ```
//!
//! and never changes afterwards. Effect and parameter order follow the
//! source document.

use crate::error::{CoreError, Result};
use crate::units::Unit;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

/// Effect id under which the transport properties (volume, speed) live
pub const PLAYBACK_EFFECT_ID: &str = "playback";

/// Catalog bundled with the crate
const DEFAULT_CATALOG_JSON: &str = include_str!("../catalog/effects.json");

/// Description of a single adjustable parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDescriptor {
    /// Parameter id, unique within its effect
    #[serde(skip)]
    pub key: String,
    pub label: String,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub default_value: f64,
    pub unit: Unit,
}

impl ParameterDescriptor {
    /// Whether `value` lies inside `[min, max]`
    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }

    /// Format `value` with this parameter's unit
    pub fn format(&self, value: f64) -> String {
        self.unit.format(value)
    }
}

/// An effect and its ordered parameters
#[derive(Debug, Clone, PartialEq)]
pub struct EffectDescriptor {
    pub id: String,
    pub name: String,
    pub parameters: Vec<ParameterDescriptor>,
}

impl EffectDescriptor {
    /// Look up a parameter by key
    pub fn parameter(&self, key: &str) -> Option<&ParameterDescriptor> {
        self.parameters.iter().find(|p| p.key == key)
    }
}

#[derive(Deserialize)]
struct RawEffect {
    name: String,
    parameters: Map<String, Value>,
}

/// Immutable set of effect descriptors
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterCatalog {
    effects: Vec<EffectDescriptor>,
}

impl ParameterCatalog {
    /// Parse a catalog from its JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        let root: Value = serde_json::from_str(json)?;
        let Value::Object(entries) = root else {
            return Err(CoreError::invalid_catalog("top level must be an object"));
        };

        let mut effects = Vec::with_capacity(entries.len());
        for (effect_id, body) in entries {
            let raw: RawEffect = serde_json::from_value(body).map_err(|e| {
                CoreError::invalid_catalog(format!("effect '{}': {}", effect_id, e))
            })?;

            let mut parameters = Vec::with_capacity(raw.parameters.len());
            for (key, body) in raw.parameters {
                let mut descriptor: ParameterDescriptor =
                    serde_json::from_value(body).map_err(|e| {
                        CoreError::invalid_catalog(format!(
                            "parameter '{}.{}': {}",
                            effect_id, key, e
                        ))
                    })?;
                descriptor.key = key;
                validate_descriptor(&effect_id, &descriptor)?;
                parameters.push(descriptor);
            }

            effects.push(EffectDescriptor {
                id: effect_id,
                name: raw.name,
                parameters,
            });
        }

        debug!("Loaded catalog with {} effects", effects.len());
        Ok(Self { effects })
    }

    /// Read and parse a catalog file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// The catalog bundled with voxfx
    pub fn bundled() -> Result<Self> {
        Self::from_json_str(DEFAULT_CATALOG_JSON)
    }

    /// All effects in catalog order
    pub fn effects(&self) -> &[EffectDescriptor] {
        &self.effects
    }

    /// Look up an effect by id
    pub fn effect(&self, id: &str) -> Option<&EffectDescriptor> {
        self.effects.iter().find(|e| e.id == id)
    }

    /// Look up a parameter of an effect
    pub fn parameter(&self, effect_id: &str, key: &str) -> Option<&ParameterDescriptor> {
        self.effect(effect_id).and_then(|e| e.parameter(key))
    }

    /// Look up a transport property (`volume`, `speed`)
    pub fn playback_property(&self, key: &str) -> Option<&ParameterDescriptor> {
        self.parameter(PLAYBACK_EFFECT_ID, key)
    }

    /// Iterate `(effect_id, descriptor)` over every parameter in order
    pub fn parameters(&self) -> impl Iterator<Item = (&str, &ParameterDescriptor)> {
        self.effects
            .iter()
            .flat_map(|e| e.parameters.iter().map(move |p| (e.id.as_str(), p)))
    }

    /// Serialize back to the catalog JSON shape
    pub fn to_json(&self) -> Value {
        let mut root = Map::new();
        for effect in &self.effects {
            let mut parameters = Map::new();
            for p in &effect.parameters {
                // Descriptor fields are plain numbers and strings
                if let Ok(value) = serde_json::to_value(p) {
                    parameters.insert(p.key.clone(), value);
                }
            }
            let mut body = Map::new();
            body.insert("name".to_string(), Value::String(effect.name.clone()));
            body.insert("parameters".to_string(), Value::Object(parameters));
            root.insert(effect.id.clone(), Value::Object(body));
        }
        Value::Object(root)
    }
}

fn validate_descriptor(effect_id: &str, p: &ParameterDescriptor) -> Result<()> {
    if !(p.min.is_finite() && p.max.is_finite()) || p.min > p.max {
        return Err(CoreError::invalid_catalog(format!(
            "parameter '{}.{}' has an empty range [{}, {}]",
            effect_id, p.key, p.min, p.max
        )));
    }
    if !p.contains(p.default_value) {
        return Err(CoreError::DefaultOutOfRange {
            effect: effect_id.to_string(),
            parameter: p.key.clone(),
            default: p.default_value,
            min: p.min,
            max: p.max,
        });
    }
    Ok(())
}
