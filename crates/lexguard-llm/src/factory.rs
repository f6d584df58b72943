//! Factory for creating analysis clients.

use std::sync::Arc;

use lexguard_core::config::LexConfig;
use lexguard_core::error::LexResult;
use lexguard_core::traits::{AnalysisClient, ClientConfig};

use crate::gemini::GeminiClient;

/// Factory for creating analysis clients.
pub struct ClientFactory;

impl ClientFactory {
    /// Create a client from the given configuration.
    ///
    /// Falls back to `GEMINI_API_KEY` when the configuration has no key.
    pub fn create(mut config: ClientConfig) -> LexResult<Arc<dyn AnalysisClient>> {
        if config.api_key.is_none() {
            config.api_key = std::env::var("GEMINI_API_KEY").ok();
        }
        let client = GeminiClient::new(config)?;
        Ok(Arc::new(client))
    }

    /// Create a client for a full lexguard configuration.
    pub fn from_config(config: &LexConfig) -> LexResult<Arc<dyn AnalysisClient>> {
        Self::create(config.client.clone())
    }

    /// Create a Gemini client with default configuration.
    pub fn gemini() -> LexResult<Arc<dyn AnalysisClient>> {
        Self::create(ClientConfig::default())
    }

    /// Create a Gemini client with a specific model.
    pub fn gemini_with_model(model: impl Into<String>) -> LexResult<Arc<dyn AnalysisClient>> {
        let config = ClientConfig {
            model: model.into(),
            ..Default::default()
        };
        Self::create(config)
    }
}
