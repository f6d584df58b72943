//! Terminal rendering of the popup.

use std::fmt::Write;

use tracing::debug;

use lexguard_core::traits::PopupView;
use lexguard_core::types::{AnalysisView, FlagEntry, HistoryStats};

/// Prints results to stdout and progress to stderr.
#[derive(Debug, Default)]
pub struct TerminalView {
    json: bool,
}

impl TerminalView {
    pub fn new(json: bool) -> Self {
        Self { json }
    }
}

impl PopupView for TerminalView {
    fn set_trigger_enabled(&self, enabled: bool) {
        debug!(enabled, "Trigger state changed");
    }

    fn show_loading(&self, message: &str) {
        if !self.json {
            eprintln!("{}", message);
        }
    }

    fn show_error(&self, message: &str) {
        eprintln!("Error: {}", message);
    }

    fn render_analysis(&self, view: &AnalysisView) {
        if self.json {
            match serde_json::to_string_pretty(view) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("Error: {}", e),
            }
        } else {
            print!("{}", format_analysis(view));
        }
    }

    fn render_stats(&self, stats: &HistoryStats) {
        if !self.json {
            println!("{}", format_stats(stats));
        }
    }

    fn clear(&self) {
        debug!("Cleared result");
    }
}

/// Human-readable report for one analysis.
pub fn format_analysis(view: &AnalysisView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", view.title);

    let score = view
        .risk_score
        .map(|s| format!("{}/100", s))
        .unwrap_or_else(|| "n/a".to_string());
    let _ = writeln!(
        out,
        "Risk score: {} ({})",
        score,
        view.risk_level.to_uppercase()
    );
    if view.metadata.truncated {
        let _ = writeln!(
            out,
            "Note: only the first part of this {}-character document was analyzed.",
            view.metadata.character_count
        );
    }

    if let Some(summary) = &view.summary {
        let _ = writeln!(out, "\n{}", summary);
    }

    if view.has_red_flags() {
        let _ = writeln!(out, "\n!! This document contains clauses that may work against you.");
    }
    write_flags(&mut out, "Red flags", &view.red_flags);
    write_flags(&mut out, "Yellow flags", &view.yellow_flags);
    write_flags(&mut out, "Green flags", &view.green_flags);

    if !view.negotiation_advice.is_empty() {
        let _ = writeln!(out, "\nNegotiation advice:");
        for advice in &view.negotiation_advice {
            let _ = writeln!(out, "  - {}", advice);
        }
    }
    out
}

fn write_flags(out: &mut String, heading: &str, flags: &[FlagEntry]) {
    if flags.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{} ({}):", heading, flags.len());
    for flag in flags {
        if flag.clause_type.is_empty() {
            let _ = writeln!(out, "  - {}", flag.clause);
        } else {
            let _ = writeln!(out, "  - [{}] {}", flag.clause_type, flag.clause);
        }
        if let Some(explanation) = &flag.explanation {
            let _ = writeln!(out, "      {}", explanation);
        }
    }
}

/// One-line history footer.
pub fn format_stats(stats: &HistoryStats) -> String {
    match stats.average_risk_score {
        Some(average) => format!(
            "Documents scanned: {} | Average risk: {:.0}",
            stats.count, average
        ),
        None => format!("Documents scanned: {}", stats.count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lexguard_core::types::{AnalysisMetadata, AnalysisRecord};

    fn view(record: AnalysisRecord, truncated: bool) -> AnalysisView {
        AnalysisView::new(
            &record,
            AnalysisMetadata {
                character_count: 600_000,
                truncated,
                timestamp: Utc::now(),
            },
        )
    }

    #[test]
    fn test_report_lists_flags_and_advice() {
        let record = AnalysisRecord {
            risk_score: Some(85.0),
            risk_level: Some("high".to_string()),
            document_type: Some("lease".to_string()),
            red_flags: vec![FlagEntry::new("Termination", "Terminate at will")],
            negotiation_advice: vec!["Ask for notice".to_string()],
            ..Default::default()
        };
        let report = format_analysis(&view(record, false));

        assert!(report.starts_with("lease\n"));
        assert!(report.contains("Risk score: 85/100 (HIGH)"));
        assert!(report.contains("Red flags (1):"));
        assert!(report.contains("[Termination] Terminate at will"));
        assert!(report.contains("  - Ask for notice"));
        assert!(!report.contains("Yellow flags"));
        assert!(!report.contains("Note:"));
    }

    #[test]
    fn test_report_notes_truncation() {
        let report = format_analysis(&view(AnalysisRecord::default(), true));
        assert!(report.contains("Risk score: n/a (UNKNOWN)"));
        assert!(report.contains("600000-character"));
    }

    #[test]
    fn test_stats_footer() {
        assert_eq!(
            format_stats(&HistoryStats {
                count: 3,
                average_risk_score: Some(61.4)
            }),
            "Documents scanned: 3 | Average risk: 61"
        );
        assert_eq!(
            format_stats(&HistoryStats::default()),
            "Documents scanned: 0"
        );
    }
}
