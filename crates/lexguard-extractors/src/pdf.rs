//! PDF content extraction using pdf-extract.

use async_trait::async_trait;
use tracing::debug;

use crate::error::{ExtractError, ExtractResult};
use crate::types::ExtractedContent;
use crate::Extractor;

/// The only MIME type accepted for uploads.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// PDF content extractor using the pdf-extract library.
///
/// Extracts text from PDF files, wrapping the synchronous pdf-extract
/// call in spawn_blocking to avoid blocking the async runtime.
#[derive(Debug, Clone)]
pub struct PdfExtractor {
    /// Minimum text length to consider extraction successful
    /// (image-only PDFs yield little or no text).
    min_text_length: usize,
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfExtractor {
    /// Create new PDF extractor with default settings.
    pub fn new() -> Self {
        Self {
            min_text_length: 10,
        }
    }

    /// Create PDF extractor with custom minimum text threshold.
    pub fn with_min_text_length(min_text_length: usize) -> Self {
        Self { min_text_length }
    }
}

#[async_trait]
impl Extractor for PdfExtractor {
    async fn extract(&self, content: &[u8]) -> ExtractResult<ExtractedContent> {
        if !content.starts_with(b"%PDF") {
            return Err(ExtractError::NotPdf);
        }

        let data = content.to_vec();
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&data))
            .await?
            .map_err(|e| ExtractError::UnreadablePdf(e.to_string()))?;

        let text = text.trim().to_string();
        debug!(length = text.chars().count(), "Extracted PDF text");
        if text.chars().count() < self.min_text_length {
            return Err(ExtractError::NoText);
        }

        Ok(ExtractedContent::new(text, PDF_MIME_TYPE))
    }

    fn name(&self) -> &str {
        "pdf-extract"
    }
}
