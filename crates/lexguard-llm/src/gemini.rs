//! Google Gemini provider implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use lexguard_core::error::{ErrorCode, LexError, LexResult};
use lexguard_core::traits::{AnalysisClient, ClientConfig, RemoteCallResult, SafetySetting};

/// Default API root.
pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const INVALID_RESPONSE: &str = "Invalid response from Gemini API";

/// Gemini `generateContent` client.
pub struct GeminiClient {
    client: Client,
    config: ClientConfig,
    endpoint: Url,
    api_key: Option<SecretString>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
    safety_settings: &'a [SafetySetting],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: Option<String>,
}

impl GeminiClient {
    /// Create a new Gemini client.
    ///
    /// A missing API key is not an error here; every call fails with a
    /// credential error until one is configured.
    pub fn new(config: ClientConfig) -> LexResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .map(SecretString::new);

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| GEMINI_API_URL.to_string());
        let endpoint = Url::parse(&format!(
            "{}/models/{}:generateContent",
            base_url.trim_end_matches('/'),
            config.model
        ))
        .map_err(|e| LexError::Configuration(format!("Invalid Gemini base URL: {}", e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LexError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            endpoint,
            api_key,
        })
    }

    /// Endpoint requests are posted to, without the key.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn request_url(&self, api_key: &SecretString) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("key", api_key.expose_secret());
        url
    }
}

#[async_trait]
impl AnalysisClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> RemoteCallResult {
        if prompt.trim().is_empty() {
            return Err(LexError::validation(
                ErrorCode::ValEmptyPrompt,
                "Prompt must not be empty",
            ));
        }
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            LexError::remote(
                ErrorCode::RmtMissingCredential,
                "Gemini API key not found. Set GEMINI_API_KEY environment variable or provide api_key in config.",
            )
        })?;

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                top_k: self.config.top_k,
                top_p: self.config.top_p,
                max_output_tokens: self.config.max_output_tokens,
            },
            safety_settings: &self.config.safety_settings,
        };

        debug!(model = %self.config.model, %prompt, "Sending Gemini request");
        let response = self
            .client
            .post(self.request_url(api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                LexError::remote(
                    ErrorCode::RmtTransport,
                    format!("Gemini API request failed: {}", e.without_url()),
                )
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            LexError::remote(
                ErrorCode::RmtTransport,
                format!("Failed to read response body: {}", e.without_url()),
            )
        })?;

        if !status.is_success() {
            let message = error_message(status, &body);
            debug!(status = status.as_u16(), %message, "Gemini API returned an error");
            return Err(LexError::http_status(status.as_u16(), message));
        }

        let text = extract_text(&body)
            .ok_or_else(|| LexError::remote(ErrorCode::RmtInvalidResponse, INVALID_RESPONSE))?;
        debug!(response = %text, "Received Gemini response");
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// `error.message` from the body, else the status reason phrase.
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<GeminiError>(body)
        .ok()
        .and_then(|e| e.error.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        })
}

/// Text of the first part of the first candidate, if it has any.
fn extract_text(body: &str) -> Option<String> {
    let response: GenerateResponse = serde_json::from_str(body).ok()?;
    response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .next()?
        .text
        .filter(|text| !text.is_empty())
}
