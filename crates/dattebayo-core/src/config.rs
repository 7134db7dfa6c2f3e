use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ai::openai::{DEFAULT_API_BASE, DEFAULT_REQUEST_TIMEOUT};
use crate::error::ChatError;
use crate::params::{RequestParameters, DEFAULT_MODEL, DEFAULT_TEMPERATURE};

const APP_DIR: &str = "dattebayo";

/// Optional settings read from `config.json`. The application never writes it.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api_base: Option<String>,
    pub default_model: Option<String>,
    pub default_temperature: Option<f32>,
    pub request_timeout_secs: Option<u64>,
    pub secrets_path: Option<PathBuf>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the user config dir; a missing file gives defaults.
    pub fn load() -> Result<Self, ChatError> {
        match Self::default_config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::new()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ChatError> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)
            .map_err(|e| ChatError::Config(format!("{}: {}", path.display(), e)))?;
        let config: Config = serde_json::from_str(&config_content)
            .map_err(|e| ChatError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }

    pub fn api_base(&self) -> &str {
        self.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)
    }

    pub fn request_params(&self) -> RequestParameters {
        RequestParameters::new(
            self.default_model.as_deref().unwrap_or(DEFAULT_MODEL),
            self.default_temperature.unwrap_or(DEFAULT_TEMPERATURE),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Managed secrets file, falling back to `secrets.json` beside the config.
    pub fn secrets_path(&self) -> Option<PathBuf> {
        self.secrets_path
            .clone()
            .or_else(|| Self::config_dir().map(|dir| dir.join("secrets.json")))
    }

    pub fn default_config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.json"))
    }

    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR))
    }
}
