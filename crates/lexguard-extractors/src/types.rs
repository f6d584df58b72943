//! Text pulled from uploaded documents.

/// Text extracted from an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    /// Extracted text handed to the analyzer.
    pub text: String,
    /// MIME type of the source document.
    pub mime_type: &'static str,
}

impl ExtractedContent {
    pub fn new(text: impl Into<String>, mime_type: &'static str) -> Self {
        Self {
            text: text.into(),
            mime_type,
        }
    }

    /// Check if extraction produced meaningful content.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Content length in characters.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }
}
