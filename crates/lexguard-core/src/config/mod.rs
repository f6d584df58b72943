//! Configuration system for lexguard.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::analyzer::AnalyzerLimits;
use crate::error::{LexError, LexResult};
use crate::history::DEFAULT_HISTORY_CAPACITY;
use crate::traits::ClientConfig;

/// Directory holding lexguard data, `~/.lexguard` when a home exists.
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".lexguard"))
        .unwrap_or_else(|| PathBuf::from(".lexguard"))
}

/// Main lexguard configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LexConfig {
    /// Remote analysis client configuration.
    pub client: ClientConfig,
    /// Input size bounds.
    pub analyzer: AnalyzerLimits,
    /// Directory of `<name>.txt` templates; the bundled set is used when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts_dir: Option<PathBuf>,
    /// Path to history database.
    pub history_db_path: PathBuf,
    /// Entries kept in the scan history.
    pub history_capacity: usize,
}

impl Default for LexConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            analyzer: AnalyzerLimits::default(),
            prompts_dir: None,
            history_db_path: data_dir().join("history.db"),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl LexConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> LexResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| LexError::Configuration(e.to_string()))
            }
            Some("json") => {
                serde_json::from_str(&content).map_err(|e| LexError::Configuration(e.to_string()))
            }
            Some("yaml" | "yml") => {
                serde_yaml::from_str(&content).map_err(|e| LexError::Configuration(e.to_string()))
            }
            _ => Err(LexError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply environment variables on top of this configuration.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(api_key) = std::env::var("GEMINI_API_KEY") {
            if !api_key.trim().is_empty() {
                self.client.api_key = Some(api_key);
            }
        }
        if let Ok(model) = std::env::var("LEXGUARD_MODEL") {
            self.client.model = model;
        }
        if let Ok(base_url) = std::env::var("LEXGUARD_BASE_URL") {
            self.client.base_url = Some(base_url);
        }
        if let Ok(dir) = std::env::var("LEXGUARD_PROMPTS_DIR") {
            self.prompts_dir = Some(PathBuf::from(dir));
        }
        if let Ok(path) = std::env::var("LEXGUARD_HISTORY_DB_PATH") {
            self.history_db_path = PathBuf::from(path);
        }
        self
    }

    /// Reject settings no component could work with.
    pub fn validate(&self) -> LexResult<()> {
        if self.client.model.trim().is_empty() {
            return Err(LexError::Configuration("model must not be empty".to_string()));
        }
        if self.analyzer.min_chars > self.analyzer.max_chars {
            return Err(LexError::Configuration(format!(
                "analyzer.min_chars ({}) exceeds analyzer.max_chars ({})",
                self.analyzer.min_chars, self.analyzer.max_chars
            )));
        }
        if self.history_capacity == 0 {
            return Err(LexError::Configuration(
                "history_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> LexConfigBuilder {
        LexConfigBuilder::default()
    }
}

/// Builder for LexConfig.
#[derive(Default)]
pub struct LexConfigBuilder {
    config: LexConfig,
}

impl LexConfigBuilder {
    /// Set client configuration.
    pub fn client(mut self, config: ClientConfig) -> Self {
        self.config.client = config;
        self
    }

    /// Set the model name.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.client.model = model.into();
        self
    }

    /// Set the API key.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.client.api_key = Some(api_key.into());
        self
    }

    /// Set the endpoint base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.client.base_url = Some(base_url.into());
        self
    }

    pub fn analyzer(mut self, limits: AnalyzerLimits) -> Self {
        self.config.analyzer = limits;
        self
    }

    pub fn prompts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.prompts_dir = Some(dir.into());
        self
    }

    /// Set history database path.
    pub fn history_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.history_db_path = path.into();
        self
    }

    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.config.history_capacity = capacity;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> LexConfig {
        self.config
    }
}
