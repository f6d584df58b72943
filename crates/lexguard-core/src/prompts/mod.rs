//! Prompt templates and the builder that fills them.
//!
//! Templates are plain text resources with a single `{{LEGAL_TEXT}}`
//! placeholder. A [`PromptBuilder`] owns a cache keyed by template name that
//! lives as long as the builder, so each template is read from its source
//! once per process.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{LexError, LexResult};

/// Name of the template used for legal document analysis.
pub const LEGAL_ANALYSIS_TEMPLATE: &str = "legal-analysis";

/// Token replaced with the document text.
pub const LEGAL_TEXT_PLACEHOLDER: &str = "{{LEGAL_TEXT}}";

const BUNDLED: &[(&str, &str)] = &[(
    LEGAL_ANALYSIS_TEMPLATE,
    include_str!("templates/legal-analysis.txt"),
)];

/// Where template text comes from.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    /// Load the raw text of a named template.
    async fn load(&self, name: &str) -> LexResult<String>;
}

/// Templates compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledTemplates;

#[async_trait]
impl TemplateSource for BundledTemplates {
    async fn load(&self, name: &str) -> LexResult<String> {
        BUNDLED
            .iter()
            .find(|(bundled, _)| *bundled == name)
            .map(|(_, text)| text.to_string())
            .ok_or_else(|| LexError::template(name, "no bundled template with this name"))
    }
}

/// Templates read from `<dir>/<name>.txt`.
#[derive(Debug, Clone)]
pub struct DirectoryTemplates {
    dir: PathBuf,
}

impl DirectoryTemplates {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl TemplateSource for DirectoryTemplates {
    async fn load(&self, name: &str) -> LexResult<String> {
        let path = self.dir.join(format!("{}.txt", name));
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| LexError::template(name, format!("{}: {}", path.display(), e)))
    }
}

/// Builds analysis prompts from cached templates.
pub struct PromptBuilder {
    source: Arc<dyn TemplateSource>,
    cache: RwLock<HashMap<String, Arc<str>>>,
}

impl PromptBuilder {
    /// Create a builder over the given source with an empty cache.
    pub fn new(source: Arc<dyn TemplateSource>) -> Self {
        Self {
            source,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Builder over the templates compiled into the binary.
    pub fn bundled() -> Self {
        Self::new(Arc::new(BundledTemplates))
    }

    /// Fetch a template, loading it on first use.
    ///
    /// A template must contain the placeholder exactly once.
    pub async fn template(&self, name: &str) -> LexResult<Arc<str>> {
        if let Some(template) = self.cache.read().await.get(name) {
            return Ok(template.clone());
        }

        let mut cache = self.cache.write().await;
        if let Some(template) = cache.get(name) {
            return Ok(template.clone());
        }

        let text = self.source.load(name).await?;
        let occurrences = text.matches(LEGAL_TEXT_PLACEHOLDER).count();
        if occurrences != 1 {
            return Err(LexError::template(
                name,
                format!(
                    "expected exactly one {} placeholder, found {}",
                    LEGAL_TEXT_PLACEHOLDER, occurrences
                ),
            ));
        }

        debug!(template = name, length = text.len(), "Loaded prompt template");
        let template: Arc<str> = Arc::from(text);
        cache.insert(name.to_string(), template.clone());
        Ok(template)
    }

    /// Fill a named template with the given text.
    pub async fn render(&self, name: &str, text: &str) -> LexResult<String> {
        let template = self.template(name).await?;
        Ok(template.replacen(LEGAL_TEXT_PLACEHOLDER, text, 1))
    }

    /// Build the legal analysis prompt for a document.
    pub async fn build(&self, text: &str) -> LexResult<String> {
        self.render(LEGAL_ANALYSIS_TEMPLATE, text).await
    }

    /// Number of templates currently cached.
    pub async fn cached_count(&self) -> usize {
        self.cache.read().await.len()
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::bundled()
    }
}
