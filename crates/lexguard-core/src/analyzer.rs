//! Document analyzer: validate, truncate, prompt, call the model.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ErrorCode, LexError, LexResult};
use crate::prompts::PromptBuilder;
use crate::traits::AnalysisClient;
use crate::types::{AnalysisMetadata, DocumentAnalysis};

/// Size bounds applied to submitted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerLimits {
    /// Shortest text, in characters, treated as a legal document.
    pub min_chars: usize,
    /// Longest text, in characters, sent to the model.
    pub max_chars: usize,
}

impl Default for AnalyzerLimits {
    fn default() -> Self {
        Self {
            min_chars: 100,
            max_chars: 500_000,
        }
    }
}

/// Turns extracted text into raw model analysis.
///
/// The model text is returned as-is; structuring it is the caller's job.
pub struct DocumentAnalyzer {
    prompts: Arc<PromptBuilder>,
    client: Arc<dyn AnalysisClient>,
    limits: AnalyzerLimits,
}

impl DocumentAnalyzer {
    pub fn new(prompts: Arc<PromptBuilder>, client: Arc<dyn AnalysisClient>) -> Self {
        Self::with_limits(prompts, client, AnalyzerLimits::default())
    }

    pub fn with_limits(
        prompts: Arc<PromptBuilder>,
        client: Arc<dyn AnalysisClient>,
        limits: AnalyzerLimits,
    ) -> Self {
        Self {
            prompts,
            client,
            limits,
        }
    }

    pub fn limits(&self) -> AnalyzerLimits {
        self.limits
    }

    /// Check that text looks like a document worth analyzing.
    pub fn validate(&self, text: &str) -> LexResult<usize> {
        if text.trim().is_empty() {
            return Err(LexError::validation(
                ErrorCode::ValEmptyText,
                "No text provided for analysis",
            ));
        }

        let character_count = text.chars().count();
        if character_count < self.limits.min_chars {
            return Err(LexError::validation_with_suggestion(
                ErrorCode::ValTextTooShort,
                "Text too short - this doesn't appear to be a legal document",
                format!(
                    "Open a page with at least {} characters of legal text",
                    self.limits.min_chars
                ),
            ));
        }

        Ok(character_count)
    }

    /// Analyze a document's text.
    ///
    /// Client failures are returned unchanged.
    pub async fn analyze(&self, text: &str) -> LexResult<DocumentAnalysis> {
        let character_count = self.validate(text).map_err(|e| {
            warn!(error = %e, "Rejected text before analysis");
            e
        })?;

        let truncated = character_count > self.limits.max_chars;
        let subject = if truncated {
            truncate_chars(text, self.limits.max_chars)
        } else {
            text
        };
        debug!(character_count, truncated, "Starting legal document analysis");

        let prompt = self.prompts.build(subject).await?;
        let analysis = self.client.generate(&prompt).await?;

        info!(character_count, truncated, "Analysis complete");
        Ok(DocumentAnalysis {
            analysis,
            metadata: AnalysisMetadata {
                character_count,
                truncated,
                timestamp: Utc::now(),
            },
        })
    }
}

/// Longest prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
