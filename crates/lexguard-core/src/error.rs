//! Error types for lexguard operations.
//!
//! Every failure carries an [`ErrorCode`] for programmatic handling and maps
//! onto one [`ErrorKind`], the taxonomy the popup uses when reporting.

use strum::{Display, IntoStaticStr};
use thiserror::Error;

use lexguard_extractors::ExtractError;

/// Result type alias for lexguard operations.
pub type LexResult<T> = Result<T, LexError>;

/// Main error type for all lexguard operations.
#[derive(Error, Debug)]
pub enum LexError {
    /// Input validation failed (empty or short text, wrong file type).
    #[error("{message}")]
    Validation {
        message: String,
        code: ErrorCode,
        suggestion: Option<String>,
    },

    /// The page context could not be reached.
    #[error("{message}")]
    Channel { message: String, code: ErrorCode },

    /// The remote analysis endpoint failed.
    #[error("{message}")]
    Remote {
        message: String,
        code: ErrorCode,
        status: Option<u16>,
    },

    /// The model output did not have the expected structure.
    #[error("Unexpected analysis format: {message}")]
    Format { message: String, code: ErrorCode },

    /// A prompt template could not be loaded.
    #[error("Failed to load prompt: {name}: {message}")]
    Template { name: String, message: String },

    /// History persistence failed.
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Another analysis is already running.
    #[error("An analysis is already in progress")]
    Busy,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure families reported to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input; the user can fix it and try again.
    Validation,
    /// No tab, restricted page, or page context not ready.
    Channel,
    /// Credential, HTTP or transport failure at the remote endpoint.
    Remote,
    /// The model broke the output contract.
    Format,
    /// Local faults: templates, storage, configuration.
    Internal,
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Validation (VAL_xxx)
    ValEmptyText,
    ValTextTooShort,
    ValUnsupportedFile,
    ValEmptyPrompt,
    ValUnreadableFile,
    ValInvalidSelector,

    // Channel (CHN_xxx)
    ChnNoActiveTab,
    ChnRestrictedPage,
    ChnUnavailable,
    ChnExtractionFailed,

    // Remote (RMT_xxx)
    RmtMissingCredential,
    RmtHttpStatus,
    RmtInvalidResponse,
    RmtTransport,

    // Format (FMT_xxx)
    FmtInvalidJson,
    FmtInvalidField,

    // Storage (STO_xxx)
    StoReadFailed,
    StoWriteFailed,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValEmptyText => "VAL_001",
            ErrorCode::ValTextTooShort => "VAL_002",
            ErrorCode::ValUnsupportedFile => "VAL_003",
            ErrorCode::ValEmptyPrompt => "VAL_004",
            ErrorCode::ValUnreadableFile => "VAL_005",
            ErrorCode::ValInvalidSelector => "VAL_006",
            ErrorCode::ChnNoActiveTab => "CHN_001",
            ErrorCode::ChnRestrictedPage => "CHN_002",
            ErrorCode::ChnUnavailable => "CHN_003",
            ErrorCode::ChnExtractionFailed => "CHN_004",
            ErrorCode::RmtMissingCredential => "RMT_001",
            ErrorCode::RmtHttpStatus => "RMT_002",
            ErrorCode::RmtInvalidResponse => "RMT_003",
            ErrorCode::RmtTransport => "RMT_004",
            ErrorCode::FmtInvalidJson => "FMT_001",
            ErrorCode::FmtInvalidField => "FMT_002",
            ErrorCode::StoReadFailed => "STO_001",
            ErrorCode::StoWriteFailed => "STO_002",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl LexError {
    /// Create a validation error.
    pub fn validation(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code,
            suggestion: None,
        }
    }

    /// Create a validation error with suggestion.
    pub fn validation_with_suggestion(
        code: ErrorCode,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            code,
            suggestion: Some(suggestion.into()),
        }
    }

    /// Create a channel error.
    pub fn channel(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Channel {
            message: message.into(),
            code,
        }
    }

    /// Create a remote error with no HTTP status attached.
    pub fn remote(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
            code,
            status: None,
        }
    }

    /// Create a remote error for a non-2xx response.
    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
            code: ErrorCode::RmtHttpStatus,
            status: Some(status),
        }
    }

    /// Create a format error.
    pub fn format(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
            code,
        }
    }

    /// Create a template error.
    pub fn template(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Template {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a storage error.
    pub fn storage(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            code,
            source: None,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { code, .. } => *code,
            Self::Channel { code, .. } => *code,
            Self::Remote { code, .. } => *code,
            Self::Format { code, .. } => *code,
            Self::Storage { code, .. } => *code,
            _ => ErrorCode::Internal,
        }
    }

    /// Get the failure family.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Channel { .. } => ErrorKind::Channel,
            Self::Remote { .. } => ErrorKind::Remote,
            Self::Format { .. } => ErrorKind::Format,
            _ => ErrorKind::Internal,
        }
    }

    /// The underlying message, without any category prefix.
    pub fn message(&self) -> String {
        match self {
            Self::Validation { message, .. }
            | Self::Channel { message, .. }
            | Self::Remote { message, .. }
            | Self::Format { message, .. }
            | Self::Storage { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Validation { suggestion, .. } => suggestion.as_deref(),
            Self::Channel {
                code: ErrorCode::ChnUnavailable,
                ..
            } => Some("Refresh the page and try again"),
            Self::Channel {
                code: ErrorCode::ChnRestrictedPage,
                ..
            } => Some("Open a regular web page and try again"),
            Self::Remote {
                code: ErrorCode::RmtMissingCredential,
                ..
            } => Some("Set GEMINI_API_KEY or provide api_key in the configuration"),
            Self::Format { .. } => Some("The model response did not match the expected format; try again"),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for LexError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage {
            message: err.to_string(),
            code: ErrorCode::StoWriteFailed,
            source: Some(Box::new(err)),
        }
    }
}

impl From<ExtractError> for LexError {
    fn from(err: ExtractError) -> Self {
        let message = err.to_string();
        match err {
            ExtractError::NotPdf => Self::validation_with_suggestion(
                ErrorCode::ValUnsupportedFile,
                message,
                "Choose a PDF file",
            ),
            ExtractError::UnreadablePdf(_) => Self::validation_with_suggestion(
                ErrorCode::ValUnreadableFile,
                message,
                "The file may be damaged; try exporting it to PDF again",
            ),
            ExtractError::NoText => Self::validation_with_suggestion(
                ErrorCode::ValEmptyText,
                message,
                "Scanned documents need to be run through OCR first",
            ),
            ExtractError::InvalidSelector { .. } => {
                Self::validation(ErrorCode::ValInvalidSelector, message)
            }
            ExtractError::TaskJoin(_) => Self::Internal(message),
        }
    }
}
