//! A browser host backed by a URL or a local HTML file.

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

use lexguard_core::error::{ErrorCode, LexError, LexResult};
use lexguard_core::traits::{BrowserHost, Tab};
use lexguard_extractors::{handle_request, HtmlPage, PageRequest, PageResponse};

const TAB_ID: u32 = 1;

/// Single-tab host whose "content script" runs over an HTML document.
pub struct CliHost {
    tab: Tab,
    page: Option<HtmlPage>,
}

/// How to present the page to the content script.
#[derive(Debug, Default, Clone)]
pub struct PageOptions {
    /// Text to treat as the user's selection.
    pub selection: Option<String>,
    /// CSS selector whose matching elements become the selection.
    pub select: Option<String>,
}

impl PageOptions {
    /// Whether the analysis should run over a selection.
    pub fn selects(&self) -> bool {
        self.selection.is_some() || self.select.is_some()
    }
}

impl CliHost {
    /// Open a target: an `http(s)://` URL, a `file://` URL, or a local path.
    ///
    /// Any other scheme yields a tab with no page behind it.
    pub async fn open(target: &str, options: &PageOptions) -> LexResult<Self> {
        let (url, html) = match Url::parse(target) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                let html = fetch(&url).await?;
                (url.to_string(), Some(html))
            }
            Ok(url) if url.scheme() == "file" => {
                let path = url.to_file_path().map_err(|_| {
                    LexError::validation(ErrorCode::ValUnsupportedFile, "Invalid file URL")
                })?;
                (url.to_string(), Some(read_file(&path).await?))
            }
            // Drive letters parse as one-letter schemes.
            Ok(url) if url.scheme().len() > 1 => (target.to_string(), None),
            _ => {
                let path = Path::new(target);
                let html = read_file(path).await?;
                let absolute = std::fs::canonicalize(path)?;
                let url = Url::from_file_path(&absolute)
                    .map(|u| u.to_string())
                    .unwrap_or_else(|_| target.to_string());
                (url, Some(html))
            }
        };

        let page = match html {
            Some(html) => Some(build_page(html, &url, options)?),
            None => None,
        };
        let mut tab = Tab::new(TAB_ID, url);
        tab.title = page.as_ref().map(HtmlPage::title).filter(|t| !t.is_empty());

        info!(url = %tab.url, title = ?tab.title, "Opened tab");
        Ok(Self { tab, page })
    }

    /// Host over HTML already in memory.
    pub fn from_html(html: impl Into<String>, url: &str, options: &PageOptions) -> LexResult<Self> {
        let page = build_page(html.into(), url, options)?;
        let mut tab = Tab::new(TAB_ID, url);
        tab.title = Some(page.title()).filter(|t| !t.is_empty());
        Ok(Self {
            tab,
            page: Some(page),
        })
    }

    pub fn tab(&self) -> &Tab {
        &self.tab
    }
}

fn build_page(html: String, url: &str, options: &PageOptions) -> LexResult<HtmlPage> {
    let mut page = HtmlPage::new(html, url);
    if let Some(css) = &options.select {
        page = page.select_css(css)?;
    }
    if let Some(selection) = &options.selection {
        page = page.with_selection(selection.clone());
    }
    Ok(page)
}

async fn fetch(url: &Url) -> LexResult<String> {
    debug!(%url, "Fetching page");
    let unreachable = |e: reqwest::Error| {
        LexError::channel(
            ErrorCode::ChnUnavailable,
            format!("Could not load {}: {}", url, e),
        )
    };
    let response = reqwest::get(url.clone()).await.map_err(unreachable)?;
    let status = response.status();
    if !status.is_success() {
        return Err(LexError::channel(
            ErrorCode::ChnUnavailable,
            format!("Could not load {}: HTTP {}", url, status),
        ));
    }
    response.text().await.map_err(unreachable)
}

async fn read_file(path: &Path) -> LexResult<String> {
    tokio::fs::read_to_string(path).await.map_err(|e| {
        LexError::validation(
            ErrorCode::ValUnsupportedFile,
            format!("Could not read {}: {}", path.display(), e),
        )
    })
}

#[async_trait]
impl BrowserHost for CliHost {
    async fn active_tab(&self) -> LexResult<Option<Tab>> {
        Ok(Some(self.tab.clone()))
    }

    async fn send_message(&self, tab_id: u32, request: PageRequest) -> LexResult<PageResponse> {
        match &self.page {
            Some(page) if tab_id == self.tab.id => Ok(handle_request(page, request)),
            _ => Err(LexError::channel(
                ErrorCode::ChnUnavailable,
                "Could not establish connection. Receiving end does not exist.",
            )),
        }
    }
}
