//! lexguard-extractors - Text extraction for legal document analysis.
//!
//! Provides the page-context side of lexguard: turning a web page into the
//! plain text the analyzer consumes, answering content-script requests, and
//! pulling text out of uploaded PDF documents.
//!
//! # Features
//!
//! - `pdf` (default) - PDF text extraction via pdf-extract
//!
//! # Example
//!
//! ```ignore
//! use lexguard_extractors::{handle_request, Extractor, HtmlPage, PageRequest, PdfExtractor};
//!
//! let page = HtmlPage::new(html, "https://example.com/terms");
//! let text = page.extract_page_text();
//!
//! // Answer a message from the orchestrator
//! let response = handle_request(&page, PageRequest::ExtractText);
//!
//! // Read an uploaded PDF
//! let content = PdfExtractor::new().extract(&pdf_bytes).await?;
//! ```

mod error;
mod message;
mod page;
mod types;

#[cfg(feature = "pdf")]
mod pdf;

pub use error::{ExtractError, ExtractResult};
pub use message::{handle_request, PageRequest, PageResponse};
pub use page::{normalize_whitespace, HtmlPage, PageData, DEFAULT_NOISE_TAGS};
pub use types::ExtractedContent;

#[cfg(feature = "pdf")]
pub use pdf::{PdfExtractor, PDF_MIME_TYPE};

use async_trait::async_trait;

/// Reads text out of an uploaded document.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract text content from bytes.
    async fn extract(&self, content: &[u8]) -> ExtractResult<ExtractedContent>;

    /// Human-readable name for this extractor.
    fn name(&self) -> &str;
}
