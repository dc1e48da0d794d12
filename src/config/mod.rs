//! Configuration module for streamfx-rs
//!
//! Engine configuration is a single TOML file with one table per concern.
//! Every table and every field has a default, so a partial (or missing)
//! file is always valid.
//!
//! # Config Location
//!
//! - **Linux**: `~/.config/dev.streamfx.streamfx-rs/engine.toml`
//! - **macOS**: `~/Library/Application Support/dev.streamfx.streamfx-rs/engine.toml`
//! - **Windows**: `%APPDATA%\dev.streamfx.streamfx-rs\engine.toml`
//!
//! # Example
//!
//! ```toml
//! [pipeline]
//! name = "media-player-audio-pipeline"
//! sink_factory = "autoaudiosink"
//!
//! [pipeline.seek]
//! flush = true
//! key_unit = false
//!
//! [effects]
//! default_pitch = 1.2
//!
//! [logging]
//! filter = "info,streamfx_rs=trace"
//! directory = "/var/log/streamfx"
//! ```

use crate::backend::SeekFlags;
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "dev.streamfx.streamfx-rs";

/// Config filename
pub const CONFIG_FILE: &str = "engine.toml";

/// Default root pipeline name
pub const DEFAULT_PIPELINE_NAME: &str = "media-player-audio-pipeline";

/// Default log filter when neither `RUST_LOG` nor the config sets one
pub const DEFAULT_LOG_FILTER: &str = "info,streamfx_rs=debug";

// ==================== Config Directory ====================

/// Get the application config directory path
pub fn app_config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app config directory exists
pub fn ensure_app_config_dir() -> Result<PathBuf> {
    let dir = app_config_dir().ok_or_else(|| {
        EngineError::Config("Could not determine config directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            EngineError::Config(format!("Failed to create config directory: {}", e))
        })?;
    }

    Ok(dir)
}

// ==================== Sections ====================

/// Seek behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeekConfig {
    /// Flush queued data so the new position is heard immediately
    pub flush: bool,
    /// Snap to the nearest key unit
    pub key_unit: bool,
}

impl Default for SeekConfig {
    fn default() -> Self {
        let flags = SeekFlags::default();
        Self {
            flush: flags.flush,
            key_unit: flags.key_unit,
        }
    }
}

impl From<SeekConfig> for SeekFlags {
    fn from(config: SeekConfig) -> Self {
        SeekFlags {
            flush: config.flush,
            key_unit: config.key_unit,
        }
    }
}

/// Pipeline construction settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Name of the root pipeline
    pub name: String,
    /// Backend factory used for the audio output
    pub sink_factory: String,
    /// Name given to the worker thread
    pub worker_thread_name: String,
    pub seek: SeekConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_PIPELINE_NAME.to_string(),
            sink_factory: "autoaudiosink".to_string(),
            worker_thread_name: "media-worker".to_string(),
            seek: SeekConfig::default(),
        }
    }
}

/// Effect defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsConfig {
    /// Initial pitch factor of the pitch-shift effect
    pub default_pitch: f64,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self { default_pitch: 1.2 }
    }
}

/// Logging settings (applied by the binary, never by the library)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
    /// Directory for a daily rolling log file; stderr only when unset
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            directory: None,
        }
    }
}

// ==================== Engine Config ====================

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub pipeline: PipelineConfig,
    pub effects: EffectsConfig,
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        app_config_dir().map(|p| p.join(CONFIG_FILE))
    }

    /// Load a config file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        toml::from_str(&content).map_err(|e| {
            EngineError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })
    }

    /// Load a config file, returning defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the config to disk as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            EngineError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Seek flags derived from the pipeline section
    pub fn seek_flags(&self) -> SeekFlags {
        self.pipeline.seek.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.pipeline.name, DEFAULT_PIPELINE_NAME);
        assert_eq!(config.seek_flags(), SeekFlags::default());
        assert_eq!(config.effects.default_pitch, 1.2);
        assert!(config.logging.directory.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            [pipeline.seek]
            key_unit = false

            [effects]
            default_pitch = 0.8
            "#,
        )
        .unwrap();
        assert!(config.pipeline.seek.flush);
        assert!(!config.pipeline.seek.key_unit);
        assert_eq!(config.pipeline.sink_factory, "autoaudiosink");
        assert_eq!(config.effects.default_pitch, 0.8);
        assert_eq!(config.logging.filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_toml_serialization() {
        let mut config = EngineConfig::default();
        config.pipeline.worker_thread_name = "worker-7".to_string();
        config.logging.directory = Some(PathBuf::from("/tmp/logs"));

        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: EngineConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = EngineConfig::load_or_default("/definitely/not/here/engine.toml");
        assert_eq!(config, EngineConfig::default());
    }
}
