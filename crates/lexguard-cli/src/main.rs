//! lexguard - Risk analysis for legal documents from the command line.
//!
//! Stands in for the browser popup: a URL or local HTML file plays the
//! active tab, the terminal plays the popup, and scan history lives in a
//! SQLite database.
//!
//! # Configuration
//!
//! - `GEMINI_API_KEY` - Required for analysis
//! - `LEXGUARD_MODEL` - Optional model override
//! - `LEXGUARD_HISTORY_DB_PATH` - Optional, defaults to `~/.lexguard/history.db`
//!
//! A `.env` file in the working directory is loaded first.
//!
//! # Usage
//!
//! ```text
//! lexguard analyze https://example.com/terms
//! lexguard analyze ./lease.html --select "#clauses"
//! lexguard analyze --pdf ./contract.pdf
//! lexguard history --list
//! lexguard clear
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lexguard_core::{
    DirectoryTemplates, DocumentAnalyzer, HistoryStore, LexConfig, Orchestrator, PopupView,
    PromptBuilder, SqliteStore,
};
use lexguard_extractors::PDF_MIME_TYPE;
use lexguard_llm::ClientFactory;

mod host;
mod view;

use host::{CliHost, PageOptions};
use view::TerminalView;

#[derive(Debug, Parser)]
#[command(name = "lexguard", version, about = "Flag risky clauses in legal documents")]
struct Cli {
    /// Configuration file (.toml, .json or .yaml).
    #[arg(short, long, global = true, env = "LEXGUARD_CONFIG")]
    config: Option<PathBuf>,

    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyze a web page, a local HTML file, or a PDF.
    Analyze {
        /// URL or path of the page to analyze.
        #[arg(required_unless_present = "pdf")]
        target: Option<String>,

        /// Analyze a PDF file instead of a page.
        #[arg(long, value_name = "FILE", conflicts_with_all = ["target", "selection", "select"])]
        pdf: Option<PathBuf>,

        /// Analyze this text as the selection on the page.
        #[arg(long, conflicts_with = "select")]
        selection: Option<String>,

        /// Analyze the elements matching a CSS selector.
        #[arg(long, value_name = "CSS")]
        select: Option<String>,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show scan history statistics.
    History {
        /// List every stored scan, oldest first.
        #[arg(long)]
        list: bool,
    },
    /// Clear the displayed result and the scan history.
    #[command(alias = "reset")]
    Clear,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    let config = load_config(cli.config.as_deref())?;
    config.validate()?;
    tracing::debug!(model = %config.client.model, db = %config.history_db_path.display(), "Loaded configuration");

    let history = open_history(&config)?;

    match cli.command {
        Command::Analyze {
            target,
            pdf,
            selection,
            select,
            json,
        } => {
            let view = Arc::new(TerminalView::new(json));
            let options = PageOptions { selection, select };

            let host = match &target {
                Some(target) => CliHost::open(target, &options).await,
                None => CliHost::from_html("", "about:blank", &PageOptions::default()),
            };
            let host = match host {
                Ok(host) => host,
                Err(e) => {
                    view.show_error(&e.to_string());
                    return Ok(ExitCode::FAILURE);
                }
            };

            let orchestrator = build_orchestrator(&config, host, history, view)?;
            let outcome = match pdf {
                Some(path) => {
                    let bytes = tokio::fs::read(&path)
                        .await
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    orchestrator.analyze_pdf(&bytes, mime_for(&path)).await
                }
                None if options.selects() => orchestrator.analyze_selection().await,
                None => orchestrator.analyze_active_page().await,
            };

            // The view has already reported any failure.
            Ok(if outcome.is_ok() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::History { list } => {
            if list {
                for entry in history.read_all().await? {
                    let score = entry
                        .risk_score
                        .map(|s| format!("{:.0}", s))
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{}  {:>3}  {:<8}  {}",
                        entry.timestamp.format("%Y-%m-%d %H:%M"),
                        score,
                        entry.risk_level,
                        entry.document_type
                    );
                }
            }
            TerminalView::new(false).render_stats(&history.stats().await?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Clear => {
            let view = TerminalView::new(false);
            view.clear();
            history.clear().await?;
            println!("History cleared.");
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Configuration from a file when given, with environment overrides on top.
fn load_config(path: Option<&Path>) -> Result<LexConfig> {
    let config = match path {
        Some(path) => LexConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?
            .with_env_overrides(),
        None => LexConfig::from_env(),
    };
    Ok(config)
}

fn open_history(config: &LexConfig) -> Result<Arc<HistoryStore>> {
    let store = SqliteStore::new(&config.history_db_path).with_context(|| {
        format!(
            "Failed to open history database at {}",
            config.history_db_path.display()
        )
    })?;
    Ok(Arc::new(HistoryStore::with_capacity(
        Arc::new(store),
        config.history_capacity,
    )))
}

fn build_orchestrator(
    config: &LexConfig,
    host: CliHost,
    history: Arc<HistoryStore>,
    view: Arc<TerminalView>,
) -> Result<Orchestrator> {
    let prompts = match &config.prompts_dir {
        Some(dir) => PromptBuilder::new(Arc::new(DirectoryTemplates::new(dir))),
        None => PromptBuilder::bundled(),
    };
    let client = ClientFactory::from_config(config)?;
    let analyzer = DocumentAnalyzer::with_limits(Arc::new(prompts), client, config.analyzer);

    Ok(Orchestrator::new(
        Arc::new(host),
        Arc::new(analyzer),
        history,
        view,
    ))
}

/// MIME type a file picker would report, judged by extension.
fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => PDF_MIME_TYPE,
        Some("html" | "htm") => "text/html",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_analyze_requires_target_or_pdf() {
        assert!(Cli::try_parse_from(["lexguard", "analyze"]).is_err());
        assert!(Cli::try_parse_from(["lexguard", "analyze", "--pdf", "a.pdf"]).is_ok());
        assert!(Cli::try_parse_from(["lexguard", "analyze", "page.html", "--pdf", "a.pdf"]).is_err());
        assert!(Cli::try_parse_from([
            "lexguard", "analyze", "page.html", "--selection", "x", "--select", "p"
        ])
        .is_err());
    }

    #[test]
    fn test_reset_is_clear() {
        let cli = Cli::try_parse_from(["lexguard", "reset"]).unwrap();
        assert!(matches!(cli.command, Command::Clear));
    }

    #[test]
    fn test_mime_for() {
        assert_eq!(mime_for(Path::new("Lease.PDF")), "application/pdf");
        assert_eq!(mime_for(Path::new("notes.txt")), "text/plain");
        assert_eq!(mime_for(Path::new("archive")), "application/octet-stream");
    }
}
