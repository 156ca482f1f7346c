//! Entry point: parse the CLI, wire the pipeline context, and either serve the
//! scheduler + control API or run a one-shot command.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use papergather::analyzer::{AnalysisBackend, DeepAnalyzer, StructuredResult as DeepResult};
use papergather::cli::{build_context, Cli, Command};
use papergather::config_version;
use papergather::control_api::{self, ApiState};
use papergather::error::{Error, Result};
use papergather::extractor::{OcrBackend, PageMarkdown, PageText, TextExtractor};
use papergather::fetcher::HttpFetcher;
use papergather::history::TaskHistoryStore;
use papergather::index::HttpIndexClient;
use papergather::paths::PaperDir;
use papergather::rate_limit::RateLimiters;
use papergather::scheduler::Scheduler;
use papergather::scorer::{LlmBackend, RelevanceScorer, ScoreResult};
use tracing::info;

/// Stand-in OCR backend. A real deployment supplies its own [`OcrBackend`]
/// implementation (Tesseract, PaddleOCR, an ONNX-based engine); this crate only
/// defines the seam.
struct UnconfiguredOcrBackend;

#[async_trait]
impl OcrBackend for UnconfiguredOcrBackend {
    async fn page_count(&self, _pdf_bytes: &[u8]) -> Result<usize> {
        Err(Error::OcrFailed {
            paper_id: String::new(),
            detail: "no OCR backend configured".to_string(),
        })
    }

    async fn extract_fast(&self, _pdf_bytes: &[u8], _max_pages: usize) -> Result<Vec<PageText>> {
        Err(Error::OcrFailed {
            paper_id: String::new(),
            detail: "no OCR backend configured".to_string(),
        })
    }

    async fn extract_structured(
        &self,
        _pdf_bytes: &[u8],
        _max_pages: usize,
    ) -> Result<Vec<PageMarkdown>> {
        Err(Error::OcrFailed {
            paper_id: String::new(),
            detail: "no OCR backend configured".to_string(),
        })
    }
}

/// Stand-in LLM backend for relevance scoring. A real deployment supplies its own
/// [`LlmBackend`] implementation against whichever provider it targets.
struct UnconfiguredLlmBackend;

#[async_trait]
impl LlmBackend for UnconfiguredLlmBackend {
    async fn judge_relevance(
        &self,
        _model: &str,
        _text: &str,
        _requirements: &str,
    ) -> Result<ScoreResult> {
        Err(Error::ScoringFailed {
            paper_id: String::new(),
            detail: "no relevance-scoring backend configured".to_string(),
        })
    }
}

/// Stand-in LLM+vision backend for deep analysis.
struct UnconfiguredAnalysisBackend;

#[async_trait]
impl AnalysisBackend for UnconfiguredAnalysisBackend {
    async fn analyze(
        &self,
        _model: &str,
        _vision_model: &str,
        _paper_dir: &PaperDir,
        _thread_id: &str,
    ) -> Result<(DeepResult, String)> {
        Err(Error::AnalysisFailed {
            paper_id: String::new(),
            detail: "no deep-analysis backend configured".to_string(),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    papergather::telemetry::init(cli.verbosity());

    let settings = cli.load_settings()?;

    let fetcher = Arc::new(HttpFetcher::new(Duration::from_secs(settings.fetch_timeout_secs)));
    let extractor = TextExtractor::new(
        Arc::new(UnconfiguredOcrBackend),
        Duration::from_secs(settings.ocr_timeout_secs),
    );
    let limiters = RateLimiters::new(1.0, 4);
    let scorer = RelevanceScorer::new(
        Arc::new(UnconfiguredLlmBackend),
        limiters.clone(),
        Duration::from_secs(settings.scorer_timeout_secs),
    );
    let analyzer = DeepAnalyzer::new(
        Arc::new(UnconfiguredAnalysisBackend),
        limiters,
        Duration::from_secs(settings.analyzer_timeout_secs),
    );

    let ctx = build_context(&settings, fetcher, extractor, scorer, analyzer).await?;
    let history = Arc::new(TaskHistoryStore::new(settings.history_dir()));
    let index = Arc::new(HttpIndexClient::new(
        "https://export.arxiv.org/api/query",
        Duration::from_secs(settings.index_timeout_secs),
    ));

    let lock_pool = {
        let manager = diesel_async::pooled_connection::AsyncDieselConnectionManager::<
            papergather::store::DbConnection,
        >::new(settings.database_url());
        diesel_async::pooled_connection::deadpool::Pool::builder(manager)
            .build()
            .map_err(|e| Error::Pool(e.to_string()))?
    };

    let store_handle = ctx.store.clone();
    let settings_pool = lock_pool.clone();
    let scheduler = Scheduler::new(ctx, index, history.clone(), lock_pool);

    match cli.command {
        Command::Serve { listen } => {
            let state = ApiState {
                scheduler,
                store: store_handle,
                history,
                settings_pool,
            };
            let app = control_api::router(state);
            info!(%listen, "starting control API");
            let listener = tokio::net::TcpListener::bind(&listen).await?;
            axum::serve(listener, app).await?;
        }
        Command::RegisterTask { config } => {
            let raw = std::fs::read_to_string(config)?;
            let value: serde_json::Value = serde_json::from_str(&raw)?;
            let task_config = config_version::upgrade(value)?;
            scheduler.register(task_config).await?;
            println!("task registered");
        }
        Command::Trigger { task_id } => {
            let summary = scheduler.trigger_once(&task_id).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Cancel { task_id } => {
            let cancelled = scheduler.cancel(&task_id).await;
            println!("cancelled: {cancelled}");
        }
        Command::AnalyzeSingle {
            paper_id,
            model,
            vision_model,
        } => {
            let model = model.unwrap_or_else(|| "gpt-4o".to_string());
            let vision_model = vision_model.unwrap_or_else(|| "gpt-4o".to_string());
            let markdown = scheduler.analyze_single(&paper_id, &model, &vision_model).await?;
            println!("{markdown}");
        }
        Command::SavePreset { name, config } => {
            let presets = papergather::history::presets::ConfigPresetStore::new(
                settings.config_presets_dir(),
            );
            let raw = std::fs::read_to_string(config)?;
            let value: serde_json::Value = serde_json::from_str(&raw)?;
            let task_config = config_version::upgrade(value)?;
            presets.save_preset(&name, &task_config).await?;
            println!("preset saved: {name}");
        }
        Command::ShowPreset { name } => {
            let presets = papergather::history::presets::ConfigPresetStore::new(
                settings.config_presets_dir(),
            );
            match presets.load_preset(&name).await? {
                Some(config) => println!("{}", serde_json::to_string_pretty(&config)?),
                None => println!("no such preset: {name}"),
            }
        }
        Command::ListPresets => {
            let presets = papergather::history::presets::ConfigPresetStore::new(
                settings.config_presets_dir(),
            );
            for name in presets.list_presets().await? {
                println!("{name}");
            }
        }
    }

    Ok(())
}
