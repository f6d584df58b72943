//! Extraction error types.

use thiserror::Error;

/// Errors raised while pulling text out of a page or an uploaded document.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The bytes do not start with a PDF header.
    #[error("The file is not a PDF document")]
    NotPdf,

    /// The PDF header is present but the document could not be read.
    #[error("Could not read the PDF: {0}")]
    UnreadablePdf(String),

    /// The document holds no usable text (for example a scanned image).
    #[error("No text could be extracted from the document")]
    NoText,

    /// A CSS selector could not be parsed.
    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    /// The blocking reader task panicked or was cancelled.
    #[error("PDF reader task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;
