//! Service configuration.
//!
//! A TOML file with one section per concern, overridden by `LAFAL_*`
//! environment variables and validated before anything starts.

use crate::defaults;
use crate::error::{LafalError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub decision: DecisionConfig,
    pub pipeline: PipelineSettings,
    pub history: HistoryConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub api_key: Option<String>,
    pub max_upload_bytes: usize,
}

/// Classifier artifact location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    pub path: PathBuf,
    pub url: Option<String>,
    pub sha256: Option<String>,
}

/// Decision rule configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DecisionConfig {
    pub threshold: f64,
}

/// Per-request pipeline behavior
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct PipelineSettings {
    /// Directory for staged uploads (None = system temp dir)
    pub staging_dir: Option<PathBuf>,
    /// Request timeout as a humantime string, e.g. "30s" (None = no timeout)
    pub timeout: Option<String>,
    pub persistence: PersistencePolicy,
}

/// What to do when the history write fails after a successful classification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PersistencePolicy {
    /// Fail the whole request
    #[default]
    Required,
    /// Log and still return the classification
    BestEffort,
}

/// History sink configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    pub path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: defaults::BIND_ADDR.to_string(),
            api_key: None,
            max_upload_bytes: defaults::MAX_UPLOAD_BYTES,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: models_dir().join(defaults::MODEL_FILE_NAME),
            url: None,
            sha256: None,
        }
    }
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            threshold: defaults::CORRECT_THRESHOLD,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from(".local/share"))
                .join("lafal")
                .join("history.jsonl"),
        }
    }
}

impl PipelineSettings {
    /// Parsed request timeout.
    pub fn timeout_duration(&self) -> Result<Option<Duration>> {
        match self.timeout.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => humantime::parse_duration(s)
                .map(Some)
                .map_err(|e| LafalError::ConfigInvalidValue {
                    key: "pipeline.timeout".to_string(),
                    message: e.to_string(),
                }),
        }
    }
}

/// Directory where classifier artifacts are stored.
///
/// Uses `~/.cache/lafal/models/` on Linux/Unix.
pub fn models_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("lafal")
        .join("models")
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(LafalError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - LAFAL_API_KEY → server.api_key
    /// - LAFAL_BIND → server.bind
    /// - LAFAL_MODEL_PATH → model.path
    /// - LAFAL_MODEL_URL → model.url
    /// - LAFAL_HISTORY_PATH → history.path
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var("LAFAL_API_KEY")
            && !key.is_empty()
        {
            self.server.api_key = Some(key);
        }

        if let Ok(bind) = std::env::var("LAFAL_BIND")
            && !bind.is_empty()
        {
            self.server.bind = bind;
        }

        if let Ok(path) = std::env::var("LAFAL_MODEL_PATH")
            && !path.is_empty()
        {
            self.model.path = PathBuf::from(path);
        }

        if let Ok(url) = std::env::var("LAFAL_MODEL_URL")
            && !url.is_empty()
        {
            self.model.url = Some(url);
        }

        if let Ok(path) = std::env::var("LAFAL_HISTORY_PATH")
            && !path.is_empty()
        {
            self.history.path = PathBuf::from(path);
        }

        self
    }

    /// Reject values that would make the service misbehave at runtime.
    pub fn validate(&self) -> Result<()> {
        let threshold = self.decision.threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(LafalError::ConfigInvalidValue {
                key: "decision.threshold".to_string(),
                message: format!("must be within [0, 1], got {threshold}"),
            });
        }
        if self.server.max_upload_bytes == 0 {
            return Err(LafalError::ConfigInvalidValue {
                key: "server.max_upload_bytes".to_string(),
                message: "must be positive".to_string(),
            });
        }
        self.pipeline.timeout_duration()?;
        Ok(())
    }

    /// Render the effective configuration as TOML, with the API key masked.
    pub fn to_display_toml(&self) -> Result<String> {
        let mut shown = self.clone();
        if shown.server.api_key.is_some() {
            shown.server.api_key = Some("********".to_string());
        }
        toml::to_string_pretty(&shown).map_err(|e| LafalError::Other(e.to_string()))
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/lafal/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join("lafal")
            .join("config.toml")
    }
}
