//! Browser host surfaces: the active tab and page-context messaging.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use lexguard_extractors::{PageRequest, PageResponse};

use crate::error::LexResult;

/// URL scheme prefixes that content scripts cannot be injected into.
pub const RESTRICTED_SCHEMES: &[&str] = &[
    "chrome://",
    "chrome-extension://",
    "edge://",
    "about:",
    "moz-extension://",
    "devtools://",
    "view-source:",
];

/// A browser tab as seen by the popup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    pub id: u32,
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
}

impl Tab {
    pub fn new(id: u32, url: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
            title: None,
        }
    }

    /// Whether this tab is served under a browser-internal scheme.
    pub fn is_restricted(&self) -> bool {
        let url = self.url.trim_start().to_ascii_lowercase();
        RESTRICTED_SCHEMES.iter().any(|scheme| url.starts_with(scheme))
    }
}

/// The browser the popup runs in.
///
/// `send_message` must fail fast with a channel error when nothing is
/// listening in the tab; it must not wait for a listener to appear.
#[async_trait]
pub trait BrowserHost: Send + Sync {
    /// The focused tab of the current window, if any.
    async fn active_tab(&self) -> LexResult<Option<Tab>>;

    /// Deliver a request to the page context of a tab.
    async fn send_message(&self, tab_id: u32, request: PageRequest) -> LexResult<PageResponse>;
}
