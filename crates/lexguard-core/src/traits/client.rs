//! Remote analysis client trait and generation settings.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LexResult;

/// Outcome of a single remote call: the model text, or why there is none.
pub type RemoteCallResult = LexResult<String>;

/// A generative-text endpoint that turns a prompt into model text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    /// Send one prompt and return the first candidate's text.
    async fn generate(&self, prompt: &str) -> RemoteCallResult;

    /// Get the model name.
    fn model_name(&self) -> &str;
}

/// Content-safety rule sent with every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

impl SafetySetting {
    pub fn new(category: impl Into<String>, threshold: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            threshold: threshold.into(),
        }
    }
}

/// Remote client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Model name/identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Top-k sampling.
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    /// Top-p nucleus sampling.
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    /// Output token ceiling.
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// Safety thresholds; only high-severity content is blocked by default.
    #[serde(default = "default_safety_settings")]
    pub safety_settings: Vec<SafetySetting>,
    /// API key (if not using environment variable).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL for API.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "gemini-3-flash-preview".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_top_k() -> u32 {
    20
}

fn default_top_p() -> f32 {
    0.85
}

fn default_max_output_tokens() -> u32 {
    8192
}

fn default_safety_settings() -> Vec<SafetySetting> {
    vec![SafetySetting::new(
        "HARM_CATEGORY_DANGEROUS_CONTENT",
        "BLOCK_ONLY_HIGH",
    )]
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            top_k: default_top_k(),
            top_p: default_top_p(),
            max_output_tokens: default_max_output_tokens(),
            safety_settings: default_safety_settings(),
            api_key: None,
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}
