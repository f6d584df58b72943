//! Orchestrator: drives one analysis from trigger to rendered result.
//!
//! Extraction, analysis, parsing, history and rendering happen in that
//! order. Every outcome ends back in [`OrchestratorState::Idle`] with the
//! trigger re-enabled; a failure is shown on the view first, a result is
//! rendered in [`OrchestratorState::Displaying`] first.

mod state;

pub use state::OrchestratorState;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use lexguard_extractors::{Extractor, PageRequest, PdfExtractor, PDF_MIME_TYPE};

use crate::analyzer::DocumentAnalyzer;
use crate::error::{ErrorCode, LexError, LexResult};
use crate::history::HistoryStore;
use crate::parser::parse_analysis;
use crate::traits::{BrowserHost, PopupView};
use crate::types::{AnalysisView, HistoryEntry, HistoryStats};

/// Where the document text comes from.
#[derive(Debug, Clone, Copy)]
enum Subject<'a> {
    Page(PageRequest),
    Pdf { bytes: &'a [u8], mime_type: &'a str },
}

/// Coordinates the popup, the page context, the analyzer and history.
pub struct Orchestrator {
    host: Arc<dyn BrowserHost>,
    analyzer: Arc<DocumentAnalyzer>,
    history: Arc<HistoryStore>,
    view: Arc<dyn PopupView>,
    pdf_reader: Arc<dyn Extractor>,
    state: Mutex<OrchestratorState>,
}

impl Orchestrator {
    pub fn new(
        host: Arc<dyn BrowserHost>,
        analyzer: Arc<DocumentAnalyzer>,
        history: Arc<HistoryStore>,
        view: Arc<dyn PopupView>,
    ) -> Self {
        Self {
            host,
            analyzer,
            history,
            view,
            pdf_reader: Arc::new(PdfExtractor::new()),
            state: Mutex::new(OrchestratorState::Idle),
        }
    }

    /// Replace the reader used for uploaded PDFs.
    pub fn with_pdf_reader(mut self, reader: Arc<dyn Extractor>) -> Self {
        self.pdf_reader = reader;
        self
    }

    pub fn state(&self) -> OrchestratorState {
        *self.lock_state()
    }

    /// Analyze the full text of the active tab.
    pub async fn analyze_active_page(&self) -> LexResult<AnalysisView> {
        self.run(Subject::Page(PageRequest::ExtractText)).await
    }

    /// Analyze the user's selection in the active tab.
    pub async fn analyze_selection(&self) -> LexResult<AnalysisView> {
        self.run(Subject::Page(PageRequest::ExtractData)).await
    }

    /// Analyze an uploaded file; only PDFs are accepted.
    pub async fn analyze_pdf(&self, bytes: &[u8], mime_type: &str) -> LexResult<AnalysisView> {
        self.run(Subject::Pdf { bytes, mime_type }).await
    }

    /// Clear the displayed result and return to idle.
    pub fn reset(&self) -> LexResult<()> {
        {
            let mut state = self.lock_state();
            if state.is_in_flight() {
                return Err(LexError::Busy);
            }
            *state = OrchestratorState::Idle;
        }
        debug!("Reset to idle");
        self.view.clear();
        self.view.set_trigger_enabled(true);
        Ok(())
    }

    /// Count and average score of past scans.
    pub async fn history_stats(&self) -> LexResult<HistoryStats> {
        self.history.stats().await
    }

    /// Fetch history statistics and draw them on the view.
    pub async fn show_stats(&self) -> LexResult<HistoryStats> {
        let stats = self.history.stats().await?;
        self.view.render_stats(&stats);
        Ok(stats)
    }

    async fn run(&self, subject: Subject<'_>) -> LexResult<AnalysisView> {
        let _in_flight = self.begin()?;

        let outcome = self.execute(subject).await;
        if let Err(err) = &outcome {
            warn!(code = err.code().as_str(), kind = %err.kind(), error = %err, "Analysis failed");
            self.set_state(OrchestratorState::Idle);
            self.view.show_error(&err.to_string());
        }
        outcome
    }

    async fn execute(&self, subject: Subject<'_>) -> LexResult<AnalysisView> {
        let text = match subject {
            Subject::Page(request) => self.extract_from_page(request).await?,
            Subject::Pdf { bytes, mime_type } => self.extract_from_pdf(bytes, mime_type).await?,
        };

        self.set_state(OrchestratorState::Analyzing);
        self.view.show_loading("Analyzing document...");
        let analysis = self.analyzer.analyze(&text).await?;
        debug!(response = %analysis.analysis, "Model response");
        let record = parse_analysis(&analysis.analysis)?;

        self.history
            .append(HistoryEntry::from_record(&record, analysis.metadata.timestamp))
            .await?;
        let stats = self.history.stats().await?;

        let view = AnalysisView::new(&record, analysis.metadata);
        self.set_state(OrchestratorState::Displaying);
        self.view.render_analysis(&view);
        self.view.render_stats(&stats);
        self.set_state(OrchestratorState::Idle);
        info!(
            title = %view.title,
            risk_score = ?view.risk_score,
            red_flags = view.red_flags.len(),
            "Displayed analysis"
        );
        Ok(view)
    }

    async fn extract_from_page(&self, request: PageRequest) -> LexResult<String> {
        let tab = self
            .host
            .active_tab()
            .await?
            .ok_or_else(|| LexError::channel(ErrorCode::ChnNoActiveTab, "No active tab found"))?;

        if tab.is_restricted() {
            return Err(LexError::channel(
                ErrorCode::ChnRestrictedPage,
                "Cannot analyze browser internal pages. Please open a regular website.",
            ));
        }

        self.view.show_loading("Extracting text from page...");
        debug!(tab_id = tab.id, url = %tab.url, ?request, "Requesting text from page");
        let response = self.host.send_message(tab.id, request).await?;
        if !response.success {
            return Err(LexError::channel(
                ErrorCode::ChnExtractionFailed,
                response
                    .error
                    .unwrap_or_else(|| "Failed to extract text from page".to_string()),
            ));
        }

        match request {
            PageRequest::ExtractText => Ok(response.text.unwrap_or_default()),
            PageRequest::ExtractData => {
                let selected = response.selected_text.unwrap_or_default();
                if selected.trim().is_empty() {
                    Err(LexError::validation_with_suggestion(
                        ErrorCode::ValEmptyText,
                        "No text selected",
                        "Highlight the clauses to analyze, or analyze the whole page",
                    ))
                } else {
                    Ok(selected)
                }
            }
        }
    }

    async fn extract_from_pdf(&self, bytes: &[u8], mime_type: &str) -> LexResult<String> {
        if !mime_type.trim().eq_ignore_ascii_case(PDF_MIME_TYPE) {
            return Err(LexError::validation_with_suggestion(
                ErrorCode::ValUnsupportedFile,
                format!("Unsupported file type: {}", mime_type),
                "Choose a PDF file",
            ));
        }

        self.view.show_loading("Reading PDF...");
        let content = self.pdf_reader.extract(bytes).await?;
        debug!(reader = self.pdf_reader.name(), length = content.len(), "Extracted PDF text");
        Ok(content.text)
    }

    fn begin(&self) -> LexResult<InFlight<'_>> {
        {
            let mut state = self.lock_state();
            if state.is_in_flight() {
                debug!(state = %*state, "Rejected trigger while busy");
                return Err(LexError::Busy);
            }
            *state = OrchestratorState::Extracting;
        }
        debug!(state = %OrchestratorState::Extracting, "State transition");
        self.view.set_trigger_enabled(false);
        Ok(InFlight { orchestrator: self })
    }

    fn set_state(&self, next: OrchestratorState) {
        *self.lock_state() = next;
        debug!(state = %next, "State transition");
    }

    fn lock_state(&self) -> MutexGuard<'_, OrchestratorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Returns to idle and re-enables the trigger when an analysis ends,
/// including when its future is dropped part way.
struct InFlight<'a> {
    orchestrator: &'a Orchestrator,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.orchestrator.lock_state() = OrchestratorState::Idle;
        self.orchestrator.view.set_trigger_enabled(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::history::MemoryStore;
    use crate::prompts::PromptBuilder;
    use crate::traits::{AnalysisClient, MockAnalysisClient, RemoteCallResult, Tab};
    use async_trait::async_trait;
    use lexguard_extractors::{ExtractError, ExtractResult, ExtractedContent, PageResponse};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    const LEASE_JSON: &str = r#"{
        "riskScore": 85,
        "riskLevel": "high",
        "documentType": "lease",
        "redFlags": [{"clauseType": "Termination", "clause": "Landlord may terminate at any time"}]
    }"#;

    enum Reply {
        Page(PageResponse),
        Unavailable,
    }

    struct FakeHost {
        tab: Option<Tab>,
        reply: Reply,
        messages: AtomicUsize,
        last_request: Mutex<Option<PageRequest>>,
    }

    impl FakeHost {
        fn new(url: &str, reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                tab: Some(Tab::new(7, url)),
                reply,
                messages: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            })
        }

        fn page(text: String) -> Arc<Self> {
            Self::new("https://example.com/lease", Reply::Page(PageResponse::text(text)))
        }

        fn messages(&self) -> usize {
            self.messages.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BrowserHost for FakeHost {
        async fn active_tab(&self) -> LexResult<Option<Tab>> {
            Ok(self.tab.clone())
        }

        async fn send_message(&self, _tab_id: u32, request: PageRequest) -> LexResult<PageResponse> {
            self.messages.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request);
            match &self.reply {
                Reply::Page(response) => Ok(response.clone()),
                Reply::Unavailable => Err(LexError::channel(
                    ErrorCode::ChnUnavailable,
                    "Could not establish connection. Receiving end does not exist.",
                )),
            }
        }
    }

    #[derive(Default)]
    struct RecordingView {
        events: Mutex<Vec<String>>,
    }

    impl RecordingView {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl PopupView for RecordingView {
        fn set_trigger_enabled(&self, enabled: bool) {
            self.push(format!("trigger:{}", enabled));
        }

        fn show_loading(&self, message: &str) {
            self.push(format!("loading:{}", message));
        }

        fn show_error(&self, message: &str) {
            self.push(format!("error:{}", message));
        }

        fn render_analysis(&self, view: &AnalysisView) {
            self.push(format!("analysis:{}", view.title));
        }

        fn render_stats(&self, stats: &HistoryStats) {
            self.push(format!("stats:{}", stats.count));
        }

        fn clear(&self) {
            self.push("clear".to_string());
        }
    }

    struct Harness {
        orchestrator: Arc<Orchestrator>,
        view: Arc<RecordingView>,
        history: Arc<HistoryStore>,
    }

    fn harness(host: Arc<FakeHost>, client: Arc<dyn AnalysisClient>) -> Harness {
        let view = Arc::new(RecordingView::default());
        let history = Arc::new(HistoryStore::new(Arc::new(MemoryStore::new())));
        let analyzer = Arc::new(DocumentAnalyzer::new(Arc::new(PromptBuilder::bundled()), client));
        let orchestrator = Arc::new(Orchestrator::new(
            host,
            analyzer,
            history.clone(),
            view.clone(),
        ));
        Harness {
            orchestrator,
            view,
            history,
        }
    }

    fn replying(text: &'static str) -> Arc<dyn AnalysisClient> {
        let mut client = MockAnalysisClient::new();
        client
            .expect_generate()
            .returning(move |_| Ok(text.to_string()));
        Arc::new(client)
    }

    fn unused_client() -> Arc<dyn AnalysisClient> {
        let mut client = MockAnalysisClient::new();
        client.expect_generate().never();
        Arc::new(client)
    }

    fn lease_text() -> String {
        "The tenant agrees to the following terms. ".repeat(10)
    }

    #[tokio::test]
    async fn test_successful_page_analysis() {
        let host = FakeHost::page(lease_text());
        let h = harness(host.clone(), replying(LEASE_JSON));

        let view = h.orchestrator.analyze_active_page().await.unwrap();
        assert_eq!(view.risk_score, Some(85));
        assert_eq!(view.title, "lease");
        assert_eq!(h.orchestrator.state(), OrchestratorState::Idle);
        assert_eq!(*host.last_request.lock().unwrap(), Some(PageRequest::ExtractText));

        let events = h.view.events();
        assert_eq!(events.first().map(String::as_str), Some("trigger:false"));
        assert_eq!(events.last().map(String::as_str), Some("trigger:true"));
        assert!(events.contains(&"analysis:lease".to_string()));
        assert!(events.contains(&"stats:1".to_string()));

        let entries = h.history.read_all().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].risk_level, "high");
    }

    #[tokio::test]
    async fn test_no_active_tab() {
        let host = Arc::new(FakeHost {
            tab: None,
            reply: Reply::Unavailable,
            messages: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        });
        let h = harness(host.clone(), unused_client());

        let err = h.orchestrator.analyze_active_page().await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ChnNoActiveTab);
        assert_eq!(err.to_string(), "No active tab found");
        assert_eq!(h.orchestrator.state(), OrchestratorState::Idle);
        assert!(h.view.events().contains(&"error:No active tab found".to_string()));
        assert_eq!(h.view.events().last().map(String::as_str), Some("trigger:true"));
    }

    #[tokio::test]
    async fn test_restricted_page_sends_nothing() {
        let host = FakeHost::new(
            "chrome://settings",
            Reply::Page(PageResponse::text(lease_text())),
        );
        let h = harness(host.clone(), unused_client());

        let err = h.orchestrator.analyze_active_page().await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ChnRestrictedPage);
        assert_eq!(host.messages(), 0);
        assert_eq!(h.history.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_channel_is_not_retried() {
        let host = FakeHost::new("https://example.com", Reply::Unavailable);
        let h = harness(host.clone(), unused_client());

        let err = h.orchestrator.analyze_active_page().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Channel);
        assert_eq!(host.messages(), 1);
        assert_eq!(h.orchestrator.state(), OrchestratorState::Idle);
    }

    #[tokio::test]
    async fn test_failed_page_response() {
        let host = FakeHost::new(
            "https://example.com",
            Reply::Page(PageResponse::failure("document.body is null")),
        );
        let h = harness(host, unused_client());

        let err = h.orchestrator.analyze_active_page().await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ChnExtractionFailed);
        assert_eq!(err.to_string(), "document.body is null");
    }

    #[tokio::test]
    async fn test_short_page_is_validation_error() {
        let host = FakeHost::page("Accept cookies?".to_string());
        let h = harness(host, unused_client());

        let err = h.orchestrator.analyze_active_page().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(h.history.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unparseable_model_output_is_format_error() {
        let host = FakeHost::page(lease_text());
        let h = harness(host, replying("I could not analyze this document."));

        let err = h.orchestrator.analyze_active_page().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert_eq!(h.history.count().await.unwrap(), 0);
        assert_eq!(h.orchestrator.state(), OrchestratorState::Idle);
    }

    #[tokio::test]
    async fn test_selection_uses_extract_data() {
        let host = FakeHost::new(
            "https://example.com",
            Reply::Page(PageResponse::selection(lease_text())),
        );
        let h = harness(host.clone(), replying(LEASE_JSON));

        h.orchestrator.analyze_selection().await.unwrap();
        assert_eq!(*host.last_request.lock().unwrap(), Some(PageRequest::ExtractData));
    }

    #[tokio::test]
    async fn test_empty_selection() {
        let host = FakeHost::new(
            "https://example.com",
            Reply::Page(PageResponse::selection("  ")),
        );
        let h = harness(host, unused_client());

        let err = h.orchestrator.analyze_selection().await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValEmptyText);
    }

    #[tokio::test]
    async fn test_pdf_rejects_other_types() {
        let host = FakeHost::page(lease_text());
        let h = harness(host.clone(), unused_client());

        let err = h
            .orchestrator
            .analyze_pdf(b"PK\x03\x04", "application/zip")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValUnsupportedFile);
        assert_eq!(host.messages(), 0);
        assert_eq!(h.view.events().last().map(String::as_str), Some("trigger:true"));
    }

    #[tokio::test]
    async fn test_invalid_pdf_bytes_are_a_validation_error() {
        let host = FakeHost::page(lease_text());
        let h = harness(host, unused_client());

        let err = h
            .orchestrator
            .analyze_pdf(b"not a pdf at all", "application/pdf")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValUnsupportedFile);
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(h.orchestrator.state(), OrchestratorState::Idle);
    }

    /// Stands in for the PDF reader so uploads can be exercised without a
    /// real document.
    struct CannedReader(fn() -> ExtractResult<ExtractedContent>);

    #[async_trait]
    impl Extractor for CannedReader {
        async fn extract(&self, _content: &[u8]) -> ExtractResult<ExtractedContent> {
            (self.0)()
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    fn pdf_harness(client: Arc<dyn AnalysisClient>, reader: CannedReader) -> Harness {
        let view = Arc::new(RecordingView::default());
        let history = Arc::new(HistoryStore::new(Arc::new(MemoryStore::new())));
        let analyzer = Arc::new(DocumentAnalyzer::new(Arc::new(PromptBuilder::bundled()), client));
        let orchestrator = Orchestrator::new(
            FakeHost::page(lease_text()),
            analyzer,
            history.clone(),
            view.clone(),
        )
        .with_pdf_reader(Arc::new(reader));
        Harness {
            orchestrator: Arc::new(orchestrator),
            view,
            history,
        }
    }

    #[tokio::test]
    async fn test_pdf_upload_is_analyzed() {
        let h = pdf_harness(
            replying(LEASE_JSON),
            CannedReader(|| Ok(ExtractedContent::new(lease_text(), PDF_MIME_TYPE))),
        );

        let view = h
            .orchestrator
            .analyze_pdf(b"%PDF-1.7", "application/pdf")
            .await
            .unwrap();
        assert_eq!(view.risk_score, Some(85));
        assert_eq!(h.history.count().await.unwrap(), 1);
        assert!(h.view.events().contains(&"loading:Reading PDF...".to_string()));
        assert_eq!(h.orchestrator.state(), OrchestratorState::Idle);
    }

    #[tokio::test]
    async fn test_damaged_pdf_is_validation_not_channel_error() {
        let h = pdf_harness(
            unused_client(),
            CannedReader(|| Err(ExtractError::UnreadablePdf("xref table not found".to_string()))),
        );

        let err = h
            .orchestrator
            .analyze_pdf(b"%PDF-1.7", "application/pdf")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValUnreadableFile);
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(h.history.count().await.unwrap(), 0);
        assert_eq!(h.view.events().last().map(String::as_str), Some("trigger:true"));
    }

    #[tokio::test]
    async fn test_returns_to_idle_after_displaying() {
        let host = FakeHost::page(lease_text());
        let h = harness(host.clone(), replying(LEASE_JSON));

        h.orchestrator.analyze_active_page().await.unwrap();
        assert_eq!(h.orchestrator.state(), OrchestratorState::Idle);

        let events = h.view.events();
        let rendered = events.iter().position(|e| e == "analysis:lease").unwrap();
        let enabled = events.iter().rposition(|e| e == "trigger:true").unwrap();
        assert!(rendered < enabled);

        // A new trigger is accepted without a reset in between.
        h.orchestrator.analyze_active_page().await.unwrap();
        assert_eq!(host.messages(), 2);
        assert_eq!(h.history.count().await.unwrap(), 2);
    }

    struct GatedClient {
        started: Arc<Notify>,
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl AnalysisClient for GatedClient {
        async fn generate(&self, _prompt: &str) -> RemoteCallResult {
            self.started.notify_one();
            self.gate.notified().await;
            Ok(LEASE_JSON.to_string())
        }

        fn model_name(&self) -> &str {
            "gated"
        }
    }

    #[tokio::test]
    async fn test_second_trigger_while_busy_is_rejected() {
        let started = Arc::new(Notify::new());
        let gate = Arc::new(Notify::new());
        let host = FakeHost::page(lease_text());
        let h = harness(
            host.clone(),
            Arc::new(GatedClient {
                started: started.clone(),
                gate: gate.clone(),
            }),
        );

        let first = tokio::spawn({
            let orchestrator = h.orchestrator.clone();
            async move { orchestrator.analyze_active_page().await }
        });
        started.notified().await;
        assert_eq!(h.orchestrator.state(), OrchestratorState::Analyzing);

        let events_before = h.view.events().len();
        let err = h.orchestrator.analyze_active_page().await.unwrap_err();
        assert!(matches!(err, LexError::Busy));
        assert!(h.orchestrator.reset().is_err());
        assert_eq!(host.messages(), 1);
        assert_eq!(h.view.events().len(), events_before);

        gate.notify_one();
        first.await.unwrap().unwrap();
        assert_eq!(h.history.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_reset_clears_view() {
        let host = FakeHost::page(lease_text());
        let h = harness(host, replying(LEASE_JSON));
        h.orchestrator.analyze_active_page().await.unwrap();

        h.orchestrator.reset().unwrap();
        assert_eq!(h.orchestrator.state(), OrchestratorState::Idle);
        assert!(h.view.events().contains(&"clear".to_string()));

        let stats = h.orchestrator.history_stats().await.unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.average_risk_score, Some(85.0));
    }
}
