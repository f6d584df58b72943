//! JSON parsing for model responses.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::{ErrorCode, LexError, LexResult};
use crate::types::AnalysisRecord;

static CODE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json|JSON)?\s*([\s\S]*?)\s*```").unwrap());
static THINK_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").unwrap());

/// Strip thinking tags and Markdown fences from model output.
pub fn remove_code_blocks(content: &str) -> String {
    let content = THINK_TAGS.replace_all(content.trim(), "");
    let content = content.trim();

    CODE_BLOCK
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| content.to_string())
}

/// Extract the outermost JSON object from text with surrounding prose.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse model text into an [`AnalysisRecord`].
///
/// Anything that is not a JSON object is a format failure. Missing optional
/// fields are tolerated; fields of the wrong type are not.
pub fn parse_analysis(response: &str) -> LexResult<AnalysisRecord> {
    let cleaned = remove_code_blocks(response);
    if cleaned.is_empty() {
        return Err(LexError::format(
            ErrorCode::FmtInvalidJson,
            "the model returned an empty response",
        ));
    }

    let value: Value = match serde_json::from_str(&cleaned) {
        Ok(value) => value,
        Err(first) => extract_json(&cleaned)
            .and_then(|candidate| serde_json::from_str(candidate).ok())
            .ok_or_else(|| {
                LexError::format(
                    ErrorCode::FmtInvalidJson,
                    format!("response is not valid JSON: {}", first),
                )
            })?,
    };

    if !value.is_object() {
        return Err(LexError::format(
            ErrorCode::FmtInvalidJson,
            "expected a JSON object at the top level",
        ));
    }

    serde_json::from_value(value)
        .map_err(|e| LexError::format(ErrorCode::FmtInvalidField, e.to_string()))
}
