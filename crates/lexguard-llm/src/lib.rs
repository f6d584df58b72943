//! lexguard-llm - Remote analysis client for lexguard.
//!
//! Implements [`AnalysisClient`] against Google's Gemini `generateContent`
//! endpoint.
//!
//! # Example
//!
//! ```ignore
//! use lexguard_llm::ClientFactory;
//!
//! // Key from GEMINI_API_KEY, default model
//! let client = ClientFactory::gemini()?;
//!
//! // Or with a specific model
//! let client = ClientFactory::gemini_with_model("gemini-2.0-flash")?;
//!
//! let text = client.generate("Summarize this lease: ...").await?;
//! ```

mod factory;
mod gemini;

pub use factory::ClientFactory;
pub use gemini::{GeminiClient, GEMINI_API_URL};

// Re-export core types for convenience
pub use lexguard_core::traits::{AnalysisClient, ClientConfig, RemoteCallResult, SafetySetting};
