//! CLI configuration
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use voxfx_audio::GraphConfig;
use voxfx_control::EngineConfig;
use voxfx_core::ParameterCatalog;

/// Config file picked up from the working directory when `--config` is absent
const DEFAULT_CONFIG_FILE: &str = "voxfx.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Invalid(String),

    #[error(transparent)]
    Source(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VoxfxConfig {
    #[serde(default = "default_engine")]
    pub engine: EngineSettings,

    #[serde(default)]
    pub catalog: CatalogSettings,

    #[serde(default = "default_render")]
    pub render: RenderSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineSettings {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,

    #[serde(default = "default_command_queue_capacity")]
    pub command_queue_capacity: usize,

    #[serde(default = "default_max_delay_seconds")]
    pub max_delay_seconds: f64,

    #[serde(default = "default_impulse_seconds")]
    pub impulse_seconds: f64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CatalogSettings {
    /// Catalog JSON to use instead of the bundled one
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RenderSettings {
    #[serde(default = "default_block_frames")]
    pub block_frames: usize,

    /// Extra time rendered after playback ends so reverb and echoes decay
    #[serde(default = "default_tail_seconds")]
    pub tail_seconds: f64,
}

impl Default for VoxfxConfig {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            catalog: CatalogSettings::default(),
            render: default_render(),
        }
    }
}

impl VoxfxConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit `path` must exist; otherwise `voxfx.toml` is read when
    /// present. Environment variables override both, e.g.
    /// `VOXFX_ENGINE__SAMPLE_RATE=48000`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path).required(true));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        // Override with environment variables (prefixed with VOXFX_)
        settings = settings.add_source(
            config::Environment::with_prefix("VOXFX")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let engine = &self.engine;
        if engine.sample_rate == 0 {
            return Err(ConfigError::Invalid("engine.sample_rate must be positive".to_string()));
        }
        if engine.progress_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "engine.progress_interval_ms must be positive".to_string(),
            ));
        }
        if engine.command_queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "engine.command_queue_capacity must be positive".to_string(),
            ));
        }
        if !engine.max_delay_seconds.is_finite() || engine.max_delay_seconds <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "engine.max_delay_seconds must be positive, got {}",
                engine.max_delay_seconds
            )));
        }
        if !engine.impulse_seconds.is_finite() || engine.impulse_seconds <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "engine.impulse_seconds must be positive, got {}",
                engine.impulse_seconds
            )));
        }
        if self.render.block_frames == 0 {
            return Err(ConfigError::Invalid("render.block_frames must be positive".to_string()));
        }
        if !self.render.tail_seconds.is_finite() || self.render.tail_seconds < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "render.tail_seconds must not be negative, got {}",
                self.render.tail_seconds
            )));
        }
        Ok(())
    }

    pub fn graph_config(&self) -> GraphConfig {
        GraphConfig {
            sample_rate: self.engine.sample_rate,
            max_delay_seconds: self.engine.max_delay_seconds,
            impulse_seconds: self.engine.impulse_seconds,
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            graph: self.graph_config(),
            progress_interval: self.progress_interval(),
            queue_capacity: self.engine.command_queue_capacity,
            block_frames: self.render.block_frames,
        }
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.engine.progress_interval_ms)
    }

    /// The configured catalog, or the bundled one
    pub fn load_catalog(&self) -> voxfx_core::Result<ParameterCatalog> {
        match &self.catalog.path {
            Some(path) => ParameterCatalog::from_path(path),
            None => ParameterCatalog::bundled(),
        }
    }
}

// Default values
fn default_engine() -> EngineSettings {
    EngineSettings {
        sample_rate: default_sample_rate(),
        progress_interval_ms: default_progress_interval_ms(),
        command_queue_capacity: default_command_queue_capacity(),
        max_delay_seconds: default_max_delay_seconds(),
        impulse_seconds: default_impulse_seconds(),
    }
}

fn default_sample_rate() -> u32 {
    44_100
}

fn default_progress_interval_ms() -> u64 {
    100
}

fn default_command_queue_capacity() -> usize {
    64
}

fn default_max_delay_seconds() -> f64 {
    5.0
}

fn default_impulse_seconds() -> f64 {
    2.0
}

fn default_render() -> RenderSettings {
    RenderSettings {
        block_frames: default_block_frames(),
        tail_seconds: default_tail_seconds(),
    }
}

fn default_block_frames() -> usize {
    1024
}

fn default_tail_seconds() -> f64 {
    2.0
}
