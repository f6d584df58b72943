//! Page text extraction.
//!
//! Works on a parsed copy of the page markup, so the live document is never
//! touched. The output approximates what a browser's `innerText` yields for
//! the body with noise elements removed.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, ExtractResult};

/// Elements whose content never reaches the analyzer.
pub const DEFAULT_NOISE_TAGS: &[&str] = &[
    "script", "style", "nav", "iframe", "noscript", "aside", "svg", "template",
];

/// Elements that start on a new line.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "blockquote", "dd", "details", "dialog", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "header", "hr", "li", "main", "ol",
    "section", "summary", "table", "tbody", "thead", "tfoot", "tr", "ul",
];

/// Elements separated from their neighbours by a blank line.
const PARAGRAPH_TAGS: &[&str] = &["p", "h1", "h2", "h3", "h4", "h5", "h6", "pre"];

static EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static EXCESS_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]{2,}").unwrap());

/// Collapse whitespace the way extracted page text is normalised.
///
/// Runs of three or more newlines become exactly two, runs of two or more
/// spaces or tabs become a single space, and the result is trimmed.
pub fn normalize_whitespace(text: &str) -> String {
    let text = EXCESS_NEWLINES.replace_all(text, "\n\n");
    let text = EXCESS_SPACES.replace_all(&text, " ");
    text.trim().to_string()
}

/// Snapshot of page text plus location details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageData {
    pub text: String,
    pub title: String,
    pub url: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// A loaded page: its markup, its address and the user's selection.
#[derive(Debug, Clone)]
pub struct HtmlPage {
    html: String,
    url: String,
    selection: Option<String>,
    noise_tags: Vec<String>,
}

impl HtmlPage {
    /// Create a page from markup and the URL it was loaded from.
    pub fn new(html: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            url: url.into(),
            selection: None,
            noise_tags: DEFAULT_NOISE_TAGS.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Set the current text selection.
    pub fn with_selection(mut self, selection: impl Into<String>) -> Self {
        self.selection = Some(selection.into());
        self
    }

    /// Replace the list of excluded element names.
    pub fn with_noise_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.noise_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Select the text of every element matching a CSS selector.
    pub fn select_css(mut self, css: &str) -> ExtractResult<Self> {
        let selector = Selector::parse(css).map_err(|e| ExtractError::InvalidSelector {
            selector: css.to_string(),
            message: format!("{:?}", e),
        })?;
        let document = Html::parse_document(&self.html);
        let selected = document
            .select(&selector)
            .map(|el| self.render_element(el))
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        self.selection = Some(selected);
        Ok(self)
    }

    /// URL the page was loaded from.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Document title, or an empty string.
    pub fn title(&self) -> String {
        let document = Html::parse_document(&self.html);
        Selector::parse("title")
            .ok()
            .and_then(|selector| {
                document
                    .select(&selector)
                    .next()
                    .map(|el| el.text().collect::<String>().trim().to_string())
            })
            .unwrap_or_default()
    }

    /// Visible body text with noise removed and whitespace normalised.
    ///
    /// Returns an empty string when the page has no body or no text.
    pub fn extract_page_text(&self) -> String {
        let document = Html::parse_document(&self.html);
        let Ok(body_selector) = Selector::parse("body") else {
            return String::new();
        };
        match document.select(&body_selector).next() {
            Some(body) => self.render_element(body),
            None => String::new(),
        }
    }

    /// The current selection, trimmed.
    pub fn selected_text(&self) -> String {
        self.selection
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string()
    }

    /// Page text together with title, URL and capture time.
    pub fn extract_page_data(&self) -> PageData {
        PageData {
            text: self.extract_page_text(),
            title: self.title(),
            url: self.url.clone(),
            timestamp: Utc::now(),
        }
    }

    fn render_element(&self, element: ElementRef<'_>) -> String {
        let mut builder = TextBuilder::default();
        self.walk(element, &mut builder, false);
        normalize_whitespace(&builder.finish())
    }

    fn walk(&self, element: ElementRef<'_>, out: &mut TextBuilder, preformatted: bool) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => {
                    let content: &str = text;
                    if preformatted {
                        out.push_raw(content);
                    } else {
                        out.push_inline(content);
                    }
                }
                Node::Element(el) => {
                    let name = el.name();
                    if self.noise_tags.iter().any(|t| t == name) {
                        continue;
                    }
                    let Some(child_el) = ElementRef::wrap(child) else {
                        continue;
                    };
                    match name {
                        "br" => out.line_break(),
                        "td" | "th" => {
                            out.space();
                            self.walk(child_el, out, preformatted);
                            out.space();
                        }
                        _ => {
                            let breaks = if PARAGRAPH_TAGS.contains(&name) {
                                2
                            } else if BLOCK_TAGS.contains(&name) {
                                1
                            } else {
                                0
                            };
                            out.block_break(breaks);
                            self.walk(child_el, out, preformatted || name == "pre");
                            out.block_break(breaks);
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

/// Accumulates rendered text, deferring separators until real text follows.
#[derive(Default)]
struct TextBuilder {
    out: String,
    pending_breaks: usize,
    pending_space: bool,
}

impl TextBuilder {
    fn push_inline(&mut self, text: &str) {
        for c in text.chars() {
            if c.is_whitespace() {
                self.pending_space = true;
            } else {
                self.flush_separators();
                self.out.push(c);
            }
        }
    }

    fn push_raw(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.flush_separators();
        self.out.push_str(text);
    }

    fn line_break(&mut self) {
        self.out.push('\n');
        self.pending_space = false;
    }

    fn space(&mut self) {
        self.pending_space = true;
    }

    fn block_break(&mut self, breaks: usize) {
        self.pending_breaks = self.pending_breaks.max(breaks);
    }

    fn flush_separators(&mut self) {
        if !self.out.is_empty() {
            if self.pending_breaks > 0 {
                let trailing = self.out.len() - self.out.trim_end_matches('\n').len();
                for _ in trailing..self.pending_breaks {
                    self.out.push('\n');
                }
            } else if self.pending_space && !self.out.ends_with(|c: char| c == '\n' || c == ' ') {
                self.out.push(' ');
            }
        }
        self.pending_breaks = 0;
        self.pending_space = false;
    }

    fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TERMS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title> Terms of Service </title>
  <style>body { color: red; }</style>
</head>
<body>
  <nav><a href="/">Home</a> <a href="/about">About</a></nav>
  <script>window.tracking = true;</script>
  <h1>Terms   of Service</h1>
  <p>By using    the service you agree
     to these terms.</p>
  <aside>Related: Privacy Policy</aside>
  <iframe src="ad.html"></iframe>
  <noscript>Enable JavaScript</noscript>
  <ul><li>No refunds.</li><li>Arbitration applies.</li></ul>
</body>
</html>"#;

    #[test]
    fn test_normalize_whitespace_collapses_runs() {
        let input = "  Section 1\n\n\n\n\nSection\t\t2   applies \n\nend  ";
        assert_eq!(normalize_whitespace(input), "Section 1\n\nSection 2 applies \n\nend");
    }

    #[test]
    fn test_normalize_whitespace_keeps_single_spacing() {
        assert_eq!(normalize_whitespace("a b\nc\n\nd"), "a b\nc\n\nd");
    }

    #[test]
    fn test_extract_page_text_removes_noise() {
        let page = HtmlPage::new(TERMS_PAGE, "https://example.com/terms");
        let text = page.extract_page_text();

        assert!(!text.contains("Home"));
        assert!(!text.contains("tracking"));
        assert!(!text.contains("color: red"));
        assert!(!text.contains("Privacy Policy"));
        assert!(!text.contains("Enable JavaScript"));
        assert!(text.starts_with("Terms of Service"));
        assert!(text.contains("By using the service you agree to these terms."));
        assert!(text.contains("No refunds.\nArbitration applies."));
    }

    #[test]
    fn test_extract_page_text_separates_paragraphs() {
        let page = HtmlPage::new("<body><p>First</p><p>Second</p><div>Third<br>Fourth</div></body>", "");
        assert_eq!(page.extract_page_text(), "First\n\nSecond\n\nThird\nFourth");
    }

    #[test]
    fn test_extract_page_text_never_exceeds_two_newlines() {
        let page = HtmlPage::new("<body>a<br><br><br><br>b</body>", "");
        assert_eq!(page.extract_page_text(), "a\n\nb");
    }

    #[test]
    fn test_extract_page_text_empty_body() {
        assert_eq!(HtmlPage::new("", "").extract_page_text(), "");
        assert_eq!(HtmlPage::new("<body><script>x()</script></body>", "").extract_page_text(), "");
    }

    #[test]
    fn test_extraction_does_not_mutate_page() {
        let page = HtmlPage::new(TERMS_PAGE, "https://example.com/terms");
        let first = page.extract_page_text();
        let second = page.extract_page_text();
        assert_eq!(first, second);
    }

    #[test]
    fn test_title_and_page_data() {
        let page = HtmlPage::new(TERMS_PAGE, "https://example.com/terms");
        let data = page.extract_page_data();
        assert_eq!(data.title, "Terms of Service");
        assert_eq!(data.url, "https://example.com/terms");
        assert!(data.text.contains("Arbitration"));
    }

    #[test]
    fn test_selected_text_is_independent_of_page_text() {
        let page = HtmlPage::new(TERMS_PAGE, "").with_selection("  No refunds.  ");
        assert_eq!(page.selected_text(), "No refunds.");

        let page = HtmlPage::new(TERMS_PAGE, "");
        assert_eq!(page.selected_text(), "");
    }

    #[test]
    fn test_select_css() {
        let page = HtmlPage::new(TERMS_PAGE, "").select_css("li").unwrap();
        assert_eq!(page.selected_text(), "No refunds.\n\nArbitration applies.");

        assert!(HtmlPage::new(TERMS_PAGE, "").select_css("li[").is_err());
    }

    #[test]
    fn test_custom_noise_tags() {
        let page = HtmlPage::new("<body><header>Acme</header><p>Clause</p></body>", "")
            .with_noise_tags(["header"]);
        assert_eq!(page.extract_page_text(), "Clause");
    }
}
