//! Command model
//!
//! A [`Command`] is the wire form shared by the UI and the remote channel:
//! an operation name plus a JSON object of arguments. [`Operation::parse`]
//! turns it into a typed operation, rejecting anything malformed before the
//! router is touched.

use crate::error::{ControlError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use voxfx_core::{ParameterCatalog, PLAYBACK_EFFECT_ID};

pub const SET_EFFECT_PARAMETER: &str = "set_effect_parameter";
pub const SET_PLAYBACK_PROPERTY: &str = "set_playback_property";
pub const SEEK_AUDIO: &str = "seek_audio";
pub const PLAYBACK_CONTROL: &str = "playback_control";
pub const RESET_EFFECTS: &str = "reset_effects";

/// Where a command came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    #[default]
    Ui,
    Remote,
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ui => write!(f, "ui"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

/// Command request: `{ name, arguments }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub name: String,

    #[serde(default = "empty_arguments")]
    pub arguments: Value,

    /// Not part of the wire format
    #[serde(skip)]
    pub surface: Surface,
}

fn empty_arguments() -> Value {
    Value::Object(Map::new())
}

impl Command {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
            surface: Surface::Ui,
        }
    }

    pub fn with_surface(mut self, surface: Surface) -> Self {
        self.surface = surface;
        self
    }

    // ===== Constructors for the known operations =====

    pub fn set_effect_parameter(effect: &str, parameter: &str, value: f64) -> Self {
        Self::new(
            SET_EFFECT_PARAMETER,
            json!({ "effect": effect, "parameter": parameter, "value": value }),
        )
    }

    pub fn set_playback_property(property: &str, value: f64) -> Self {
        Self::new(
            SET_PLAYBACK_PROPERTY,
            json!({ "property": property, "value": value }),
        )
    }

    pub fn seek(direction: SeekDirection, seconds: f64) -> Self {
        Self::new(
            SEEK_AUDIO,
            json!({ "direction": direction.as_str(), "seconds": seconds }),
        )
    }

    pub fn playback(action: PlaybackAction) -> Self {
        Self::new(PLAYBACK_CONTROL, json!({ "action": action.as_str() }))
    }

    pub fn reset_effects() -> Self {
        Self::new(RESET_EFFECTS, empty_arguments())
    }
}

/// Command response: `{ success, message?, error? }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }
}

impl From<Result<String>> for CommandResponse {
    fn from(result: Result<String>) -> Self {
        match result {
            Ok(message) => Self::ok(message),
            Err(e) => Self::failed(e.to_string()),
        }
    }
}

/// `playback_control` actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackAction {
    Play,
    Pause,
    Stop,
}

impl PlaybackAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Stop => "stop",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "play" => Some(Self::Play),
            "pause" => Some(Self::Pause),
            "stop" => Some(Self::Stop),
            _ => None,
        }
    }
}

/// `seek_audio` directions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekDirection {
    Forward,
    Backward,
}

impl SeekDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "forward" => Some(Self::Forward),
            "backward" => Some(Self::Backward),
            _ => None,
        }
    }
}

/// A validated command
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    SetEffectParameter {
        effect: String,
        parameter: String,
        value: f64,
    },
    SetPlaybackProperty {
        property: String,
        value: f64,
    },
    SeekAudio {
        direction: SeekDirection,
        seconds: f64,
    },
    PlaybackControl(PlaybackAction),
    ResetEffects,
}

impl Operation {
    /// Validate a command's name and arguments
    ///
    /// Fails with `InvalidCommand` for unknown names and for missing,
    /// mistyped or non-finite arguments. Range checks happen later, in the
    /// router.
    pub fn parse(command: &Command) -> Result<Self> {
        let args = command
            .arguments
            .as_object()
            .ok_or_else(|| ControlError::invalid_command("arguments must be an object"))?;

        match command.name.as_str() {
            SET_EFFECT_PARAMETER => Ok(Self::SetEffectParameter {
                effect: string_arg(args, "effect")?.to_string(),
                parameter: string_arg(args, "parameter")?.to_string(),
                value: number_arg(args, "value")?,
            }),
            SET_PLAYBACK_PROPERTY => Ok(Self::SetPlaybackProperty {
                property: string_arg(args, "property")?.to_string(),
                value: number_arg(args, "value")?,
            }),
            SEEK_AUDIO => {
                let direction = string_arg(args, "direction")?;
                let direction = SeekDirection::parse(direction).ok_or_else(|| {
                    ControlError::invalid_command(format!("unknown seek direction: {direction}"))
                })?;
                let seconds = number_arg(args, "seconds")?;
                if seconds < 0.0 {
                    return Err(ControlError::invalid_command("seconds must not be negative"));
                }
                Ok(Self::SeekAudio { direction, seconds })
            }
            PLAYBACK_CONTROL => {
                let action = string_arg(args, "action")?;
                PlaybackAction::parse(action)
                    .map(Self::PlaybackControl)
                    .ok_or_else(|| {
                        ControlError::invalid_command(format!("unknown action: {action}"))
                    })
            }
            RESET_EFFECTS => Ok(Self::ResetEffects),
            other => Err(ControlError::invalid_command(format!(
                "unknown command: {other}"
            ))),
        }
    }
}

fn string_arg<'a>(args: &'a Map<String, Value>, key: &str) -> Result<&'a str> {
    match args.get(key) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(ControlError::invalid_command(format!(
            "argument '{key}' must be a string"
        ))),
        None => Err(ControlError::invalid_command(format!(
            "missing argument '{key}'"
        ))),
    }
}

fn number_arg(args: &Map<String, Value>, key: &str) -> Result<f64> {
    match args.get(key) {
        Some(value) => value
            .as_f64()
            .filter(|v| v.is_finite())
            .ok_or_else(|| {
                ControlError::invalid_command(format!("argument '{key}' must be a finite number"))
            }),
        None => Err(ControlError::invalid_command(format!(
            "missing argument '{key}'"
        ))),
    }
}

/// Tool list for the remote channel, one entry per known operation
///
/// Effect and property names are taken from `catalog`.
pub fn command_schema(catalog: &ParameterCatalog) -> Value {
    let effects: Vec<&str> = catalog
        .effects()
        .iter()
        .map(|e| e.id.as_str())
        .filter(|id| *id != PLAYBACK_EFFECT_ID)
        .collect();
    // Shared keys are listed once, at their first appearance
    let mut parameters: Vec<&str> = Vec::new();
    for (_, descriptor) in catalog
        .parameters()
        .filter(|(effect, _)| *effect != PLAYBACK_EFFECT_ID)
    {
        if !parameters.contains(&descriptor.key.as_str()) {
            parameters.push(descriptor.key.as_str());
        }
    }
    let properties: Vec<&str> = catalog
        .effect(PLAYBACK_EFFECT_ID)
        .map(|e| e.parameters.iter().map(|d| d.key.as_str()).collect())
        .unwrap_or_default();

    json!([
        {
            "name": SET_EFFECT_PARAMETER,
            "description": "Adjusts a specific parameter of an audio effect like reverb, delay, or a filter.",
            "parameters": {
                "type": "object",
                "properties": {
                    "effect": {
                        "type": "string",
                        "description": "The effect to modify.",
                        "enum": effects
                    },
                    "parameter": {
                        "type": "string",
                        "description": "The parameter to change.",
                        "enum": parameters
                    },
                    "value": {
                        "type": "number",
                        "description": "The new value. Mix and feedback use 0.0 to 1.0, time uses seconds, frequency uses Hertz."
                    }
                },
                "required": ["effect", "parameter", "value"]
            }
        },
        {
            "name": SET_PLAYBACK_PROPERTY,
            "description": "Sets output volume or playback speed.",
            "parameters": {
                "type": "object",
                "properties": {
                    "property": { "type": "string", "enum": properties },
                    "value": { "type": "number" }
                },
                "required": ["property", "value"]
            }
        },
        {
            "name": SEEK_AUDIO,
            "description": "Moves the playback position forward or backward.",
            "parameters": {
                "type": "object",
                "properties": {
                    "direction": { "type": "string", "enum": ["forward", "backward"] },
                    "seconds": { "type": "number", "minimum": 0 }
                },
                "required": ["direction", "seconds"]
            }
        },
        {
            "name": PLAYBACK_CONTROL,
            "description": "Controls the audio playback.",
            "parameters": {
                "type": "object",
                "properties": {
                    "action": {
                        "type": "string",
                        "description": "The action to perform.",
                        "enum": ["play", "pause", "stop"]
                    }
                },
                "required": ["action"]
            }
        },
        {
            "name": RESET_EFFECTS,
            "description": "Restores every effect and playback setting to its default.",
            "parameters": { "type": "object", "properties": {} }
        }
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let command: Command = serde_json::from_str(
            r#"{"name":"playback_control","arguments":{"action":"play"}}"#,
        )
        .unwrap();
        assert_eq!(command.surface, Surface::Ui);
        assert_eq!(
            Operation::parse(&command).unwrap(),
            Operation::PlaybackControl(PlaybackAction::Play)
        );

        let bare: Command = serde_json::from_str(r#"{"name":"reset_effects"}"#).unwrap();
        assert_eq!(Operation::parse(&bare).unwrap(), Operation::ResetEffects);
    }

    #[test]
    fn test_response_omits_absent_fields() {
        let ok = serde_json::to_value(CommandResponse::ok("Playback started.")).unwrap();
        assert_eq!(ok, json!({ "success": true, "message": "Playback started." }));

        let failed = serde_json::to_value(CommandResponse::failed("nope")).unwrap();
        assert_eq!(failed, json!({ "success": false, "error": "nope" }));
    }

    #[test]
    fn test_malformed_arguments_are_invalid() {
        let cases = [
            Command::new("launch_rockets", json!({})),
            Command::new(SET_EFFECT_PARAMETER, json!({ "effect": "reverb", "value": 0.5 })),
            Command::new(
                SET_EFFECT_PARAMETER,
                json!({ "effect": "reverb", "parameter": "mix", "value": "loud" }),
            ),
            Command::new(SEEK_AUDIO, json!({ "direction": "sideways", "seconds": 2 })),
            Command::new(SEEK_AUDIO, json!({ "direction": "forward", "seconds": -2 })),
            Command::new(PLAYBACK_CONTROL, json!({ "action": "rewind" })),
            Command::new(PLAYBACK_CONTROL, json!("play")),
        ];
        for command in &cases {
            assert!(
                matches!(Operation::parse(command), Err(ControlError::InvalidCommand(_))),
                "{command:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_integer_values_are_numbers() {
        let command = Command::new(
            SET_EFFECT_PARAMETER,
            json!({ "effect": "filter", "parameter": "frequency", "value": 800 }),
        );
        assert_eq!(
            Operation::parse(&command).unwrap(),
            Operation::SetEffectParameter {
                effect: "filter".to_string(),
                parameter: "frequency".to_string(),
                value: 800.0,
            }
        );
    }

    #[test]
    fn test_schema_lists_every_operation() {
        let catalog = ParameterCatalog::bundled().unwrap();
        let schema = command_schema(&catalog);
        let names: Vec<&str> = schema
            .as_array()
            .unwrap()
            .iter()
            .map(|tool| tool["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                SET_EFFECT_PARAMETER,
                SET_PLAYBACK_PROPERTY,
                SEEK_AUDIO,
                PLAYBACK_CONTROL,
                RESET_EFFECTS
            ]
        );

        let effects = &schema[0]["parameters"]["properties"]["effect"]["enum"];
        assert_eq!(effects, &json!(["reverb", "delay", "filter"]));
        let properties = &schema[1]["parameters"]["properties"]["property"]["enum"];
        assert_eq!(properties, &json!(["volume", "speed"]));
    }

    #[test]
    fn test_schema_lists_shared_parameter_keys_once() {
        let catalog = ParameterCatalog::from_json_str(
            r#"{
                "reverb": {"name": "Reverb", "parameters": {
                    "mix": {"label": "Mix", "min": 0, "max": 1, "step": 0.01, "defaultValue": 0.3, "unit": "percentage"}
                }},
                "delay": {"name": "Delay", "parameters": {
                    "time": {"label": "Time", "min": 0, "max": 1, "step": 0.01, "defaultValue": 0.3, "unit": "time"},
                    "mix": {"label": "Mix", "min": 0, "max": 1, "step": 0.01, "defaultValue": 0.5, "unit": "percentage"}
                }}
            }"#,
        )
        .unwrap();
        let schema = command_schema(&catalog);
        let parameters = &schema[0]["parameters"]["properties"]["parameter"]["enum"];
        assert_eq!(parameters, &json!(["mix", "time"]));
    }
}
