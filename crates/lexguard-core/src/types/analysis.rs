//! Analysis result types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Score at or above which a document is high risk.
pub const HIGH_RISK_THRESHOLD: f64 = 70.0;
/// Score at or above which a document is medium risk.
pub const MEDIUM_RISK_THRESHOLD: f64 = 40.0;

const UNKNOWN_DOCUMENT: &str = "Unknown document";

/// Display band for a risk score.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

impl RiskBand {
    /// Band a 0–100 score: ≥70 high, ≥40 medium, otherwise low.
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_RISK_THRESHOLD {
            RiskBand::High
        } else if score >= MEDIUM_RISK_THRESHOLD {
            RiskBand::Medium
        } else {
            RiskBand::Low
        }
    }

    /// Colour used for the score banner.
    pub fn color(&self) -> &'static str {
        match self {
            RiskBand::High => "#e74c3c",
            RiskBand::Medium => "#f39c12",
            RiskBand::Low => "#27ae60",
        }
    }
}

/// A finding about one clause.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "FlagRepr")]
pub struct FlagEntry {
    /// Category label, e.g. "Termination".
    pub clause_type: String,
    /// The clause or a description of it.
    pub clause: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl FlagEntry {
    pub fn new(clause_type: impl Into<String>, clause: impl Into<String>) -> Self {
        Self {
            clause_type: clause_type.into(),
            clause: clause.into(),
            explanation: None,
        }
    }
}

/// Shapes a flag arrives in from the model.
#[derive(Deserialize)]
#[serde(untagged)]
enum FlagRepr {
    Entry {
        #[serde(default, rename = "clauseType", alias = "category", alias = "type")]
        clause_type: Option<String>,
        #[serde(default, alias = "description", alias = "text")]
        clause: Option<String>,
        #[serde(default, alias = "reason")]
        explanation: Option<String>,
    },
    Text(String),
}

impl From<FlagRepr> for FlagEntry {
    fn from(repr: FlagRepr) -> Self {
        match repr {
            FlagRepr::Entry {
                clause_type,
                clause,
                explanation,
            } => Self {
                clause_type: clause_type.unwrap_or_default(),
                clause: clause.unwrap_or_default(),
                explanation,
            },
            FlagRepr::Text(clause) => Self {
                clause_type: String::new(),
                clause,
                explanation: None,
            },
        }
    }
}

/// Structured assessment returned by the model.
///
/// Nothing at the source enforces this schema, so every field is optional
/// and absent or `null` lists read as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    /// 1 for `documentType` records, 2 once `companyDocumentType` is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub risk_score: Option<f64>,
    #[serde(default)]
    pub risk_level: Option<String>,
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_document_type: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub red_flags: Vec<FlagEntry>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub yellow_flags: Vec<FlagEntry>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub green_flags: Vec<FlagEntry>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub negotiation_advice: Vec<String>,
}

impl AnalysisRecord {
    /// Document title, preferring `companyDocumentType` over `documentType`.
    pub fn title(&self) -> &str {
        self.company_document_type
            .as_deref()
            .or(self.document_type.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(UNKNOWN_DOCUMENT)
    }

    /// Score clamped to 0–100, if the model gave one.
    pub fn clamped_score(&self) -> Option<f64> {
        self.risk_score
            .filter(|s| s.is_finite())
            .map(|s| s.clamp(0.0, 100.0))
    }

    /// Band derived from the score, falling back to the model's label.
    pub fn band(&self) -> Option<RiskBand> {
        self.clamped_score().map(RiskBand::from_score).or_else(|| {
            self.risk_level
                .as_deref()
                .and_then(|level| level.trim().parse().ok())
        })
    }

    /// The model's risk label, or the derived band when it gave none.
    pub fn risk_level_label(&self) -> String {
        match self.risk_level.as_deref().map(str::trim) {
            Some(level) if !level.is_empty() => level.to_string(),
            _ => self
                .band()
                .map(|b| b.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Advice {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<Advice>::deserialize(deserializer)? {
        Some(Advice::One(text)) if !text.trim().is_empty() => vec![text],
        Some(Advice::Many(items)) => items,
        _ => Vec::new(),
    })
}

/// Size and timing details of one analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMetadata {
    /// Length of the submitted text in characters, before truncation.
    pub character_count: usize,
    /// Whether the text was cut to the size bound.
    pub truncated: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// Raw model text plus metadata, as produced by the analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentAnalysis {
    pub analysis: String,
    pub metadata: AnalysisMetadata,
}

/// Everything the popup needs to draw a result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisView {
    pub title: String,
    pub risk_score: Option<u8>,
    pub risk_level: String,
    pub band: Option<RiskBand>,
    pub color: Option<&'static str>,
    pub summary: Option<String>,
    pub red_flags: Vec<FlagEntry>,
    pub yellow_flags: Vec<FlagEntry>,
    pub green_flags: Vec<FlagEntry>,
    pub negotiation_advice: Vec<String>,
    pub metadata: AnalysisMetadata,
}

impl AnalysisView {
    pub fn new(record: &AnalysisRecord, metadata: AnalysisMetadata) -> Self {
        let band = record.band();
        Self {
            title: record.title().to_string(),
            risk_score: record.clamped_score().map(|s| s.round() as u8),
            risk_level: record.risk_level_label(),
            band,
            color: band.map(|b| b.color()),
            summary: record.summary.clone().filter(|s| !s.trim().is_empty()),
            red_flags: record.red_flags.clone(),
            yellow_flags: record.yellow_flags.clone(),
            green_flags: record.green_flags.clone(),
            negotiation_advice: record.negotiation_advice.clone(),
            metadata,
        }
    }

    /// Whether the red-flag warning should be shown.
    pub fn has_red_flags(&self) -> bool {
        !self.red_flags.is_empty()
    }
}
