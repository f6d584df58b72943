//! Scan history types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::analysis::AnalysisRecord;

/// One past scan, a lossy projection of an [`AnalysisRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub risk_score: Option<f64>,
    #[serde(default)]
    pub document_type: String,
    #[serde(default)]
    pub risk_level: String,
}

impl HistoryEntry {
    /// Project an analysis down to what the history keeps.
    ///
    /// The score is stored clamped to 0–100, as it is displayed.
    pub fn from_record(record: &AnalysisRecord, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            risk_score: record.clamped_score(),
            document_type: record.title().to_string(),
            risk_level: record.risk_level_label(),
        }
    }
}

/// Aggregates shown in the popup footer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStats {
    pub count: usize,
    pub average_risk_score: Option<f64>,
}
