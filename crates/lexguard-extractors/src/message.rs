//! Messages exchanged between the orchestrator and the page context.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::page::HtmlPage;

/// Request sent to the page context.
///
/// Serialises as `{"action": "extractText"}` / `{"action": "extractData"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PageRequest {
    /// Full visible page text.
    ExtractText,
    /// The user's current selection.
    ExtractData,
}

/// Reply from the page context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            success: true,
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn selection(selected_text: impl Into<String>) -> Self {
        Self {
            success: true,
            selected_text: Some(selected_text.into()),
            ..Default::default()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Answer a request on behalf of the page context.
pub fn handle_request(page: &HtmlPage, request: PageRequest) -> PageResponse {
    debug!(?request, url = page.url(), "Page context received request");
    match request {
        PageRequest::ExtractText => {
            let text = page.extract_page_text();
            debug!(length = text.chars().count(), "Extracted page text");
            PageResponse::text(text)
        }
        PageRequest::ExtractData => PageResponse::selection(page.selected_text()),
    }
}
