//! The popup surface the orchestrator renders into.

use crate::types::{AnalysisView, HistoryStats};

/// Rendering callbacks for the popup.
///
/// Implementations only draw; they never call back into the orchestrator.
pub trait PopupView: Send + Sync {
    /// Enable or disable the primary "analyze" control.
    fn set_trigger_enabled(&self, enabled: bool);

    /// Show progress while extracting or analyzing.
    fn show_loading(&self, message: &str);

    /// Show a failure message.
    fn show_error(&self, message: &str);

    /// Show a completed analysis.
    fn render_analysis(&self, view: &AnalysisView);

    /// Show aggregate history statistics.
    fn render_stats(&self, stats: &HistoryStats);

    /// Return to the initial screen.
    fn clear(&self);
}
