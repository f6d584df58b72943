//! lexguard-core - Core library for lexguard.
//!
//! This crate provides the analysis pipeline behind the lexguard popup:
//! prompt building, the document analyzer, model-output parsing, scan
//! history, and the orchestrator that ties them to a browser host.
//!
//! # Example
//!
//! ```ignore
//! use lexguard_core::{DocumentAnalyzer, HistoryStore, MemoryStore, Orchestrator, PromptBuilder};
//!
//! let analyzer = Arc::new(DocumentAnalyzer::new(Arc::new(PromptBuilder::bundled()), client));
//! let history = Arc::new(HistoryStore::new(Arc::new(MemoryStore::new())));
//! let orchestrator = Orchestrator::new(host, analyzer, history, view);
//!
//! // Analyze whatever the active tab shows
//! let view = orchestrator.analyze_active_page().await?;
//! println!("{} scored {:?}", view.title, view.risk_score);
//! ```

pub mod analyzer;
pub mod config;
pub mod error;
pub mod history;
pub mod orchestrator;
pub mod parser;
pub mod prompts;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use analyzer::{AnalyzerLimits, DocumentAnalyzer};
pub use config::{LexConfig, LexConfigBuilder};
pub use error::{ErrorCode, ErrorKind, LexError, LexResult};
pub use history::{HistoryStore, MemoryStore, SqliteStore, HISTORY_KEY};
pub use orchestrator::{Orchestrator, OrchestratorState};
pub use parser::parse_analysis;
pub use prompts::{BundledTemplates, DirectoryTemplates, PromptBuilder, TemplateSource};
pub use traits::{
    AnalysisClient, BrowserHost, ClientConfig, KeyValueStore, PopupView, RemoteCallResult,
    SafetySetting, Tab, UpdateFn,
};
pub use types::{
    AnalysisMetadata, AnalysisRecord, AnalysisView, DocumentAnalysis, FlagEntry, HistoryEntry,
    HistoryStats, RiskBand,
};

// Page-context messages travel between the orchestrator and the extractor.
pub use lexguard_extractors::{PageRequest, PageResponse};
