//! Popup state machine.

use serde::Serialize;
use strum::{Display, IntoStaticStr};

/// Where the popup is in the analysis flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorState {
    /// Nothing running; the trigger is enabled.
    #[default]
    Idle,
    /// Waiting on the page context or the PDF reader.
    Extracting,
    /// Waiting on the remote model.
    Analyzing,
    /// A result is on screen.
    Displaying,
}

impl OrchestratorState {
    /// Whether an analysis is running.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Extracting | Self::Analyzing)
    }
}
