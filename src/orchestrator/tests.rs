use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::*;
use crate::analyzer::{AnalysisBackend, StructuredResult as AnalyzerStructuredResult};
use crate::config_version::test_support::default_current_config;
use crate::extractor::{NullOcrBackend, TextExtractor};
use crate::fetcher::{Fetcher, FetchProgress};
use crate::models::stored_paper::{DeepAnalysisStatus, ProcessingStatus};
use crate::rate_limit::RateLimiters;
use crate::scorer::test_support::ScriptedBackend;
use crate::scorer::{RelevanceScorer, ScoreResult};

struct StubFetcher;

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(
        &self,
        _record: &PaperRecord,
        _dest_dir: &PaperDir,
        _reuse_existing: bool,
        _progress: Option<&mpsc::Sender<FetchProgress>>,
    ) -> Result<bytes::Bytes> {
        Ok(bytes::Bytes::from_static(b"%PDF-stub"))
    }
}

struct EchoAnalysis;

#[async_trait]
impl AnalysisBackend for EchoAnalysis {
    async fn analyze(
        &self,
        _model: &str,
        _vision_model: &str,
        _paper_dir: &PaperDir,
        thread_id: &str,
    ) -> Result<(AnalyzerStructuredResult, String)> {
        Ok((
            AnalyzerStructuredResult::default(),
            format!("# report for {thread_id}"),
        ))
    }
}

#[derive(Default)]
struct InMemoryStore {
    rows: Mutex<HashMap<String, StoredPaper>>,
}

#[async_trait]
impl PaperStore for InMemoryStore {
    async fn get_by_paper_id(&self, paper_id: &str) -> Result<Option<StoredPaper>> {
        Ok(self.rows.lock().unwrap().get(paper_id).cloned())
    }

    async fn create(&self, stored: &StoredPaper) -> Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        if rows.contains_key(&stored.paper_id) {
            return Ok(false);
        }
        rows.insert(stored.paper_id.clone(), stored.clone());
        Ok(true)
    }

    async fn update_status(
        &self,
        paper_id: &str,
        processing_status: ProcessingStatus,
        deep_analysis_status: Option<DeepAnalysisStatus>,
    ) -> Result<()> {
        if let Some(row) = self.rows.lock().unwrap().get_mut(paper_id) {
            row.processing_status = processing_status;
            if let Some(status) = deep_analysis_status {
                row.deep_analysis_status = status;
            }
        }
        Ok(())
    }

    async fn save_analysis_result(&self, paper_id: &str, markdown: &str) -> Result<()> {
        if let Some(row) = self.rows.lock().unwrap().get_mut(paper_id) {
            row.deep_analysis_result = Some(markdown.to_string());
        }
        Ok(())
    }

    async fn list(&self, _limit: i64, _offset: i64) -> Result<Vec<StoredPaper>> {
        Ok(self.rows.lock().unwrap().values().cloned().collect())
    }

    async fn search(&self, _query: &str, _limit: i64) -> Result<Vec<StoredPaper>> {
        Ok(Vec::new())
    }

    async fn delete(&self, paper_id: &str) -> Result<bool> {
        Ok(self.rows.lock().unwrap().remove(paper_id).is_some())
    }

    async fn bulk_reassign_task(
        &self,
        _paper_ids: &[String],
        _new_task_name: &str,
        _new_task_id: Option<&str>,
    ) -> Result<usize> {
        Ok(0)
    }
}

fn make_context(
    store: Arc<InMemoryStore>,
    abstract_results: Vec<Result<ScoreResult>>,
    full_results: Vec<Result<ScoreResult>>,
) -> (Arc<PipelineContext>, tempfile::TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    let ocr_backend = NullOcrBackend {
        pages: vec!["relevant page text".to_string()],
    };
    let abstract_backend = ScriptedBackend::new(abstract_results);
    let full_backend = ScriptedBackend::new(full_results);

    // The scorer seam is one trait; abstract and full calls share a backend in the
    // real orchestrator. Chain both queues behind one dispatcher keyed by call order.
    struct Chained {
        first: ScriptedBackend,
        second: ScriptedBackend,
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl crate::scorer::LlmBackend for Chained {
        async fn judge_relevance(
            &self,
            model: &str,
            text: &str,
            requirements: &str,
        ) -> Result<ScoreResult> {
            let n = self
                .calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if n % 2 == 0 {
                self.first.judge_relevance(model, text, requirements).await
            } else {
                self.second
                    .judge_relevance(model, text, requirements)
                    .await
            }
        }
    }

    let chained = Chained {
        first: abstract_backend,
        second: full_backend,
        calls: std::sync::atomic::AtomicUsize::new(0),
    };

    let scorer = RelevanceScorer::new(
        Arc::new(chained),
        RateLimiters::unlimited(),
        std::time::Duration::from_secs(5),
    );
    let extractor = TextExtractor::new(Arc::new(ocr_backend), std::time::Duration::from_secs(5));
    let analyzer = DeepAnalyzer::new(
        Arc::new(EchoAnalysis),
        RateLimiters::unlimited(),
        std::time::Duration::from_secs(5),
    );

    let ctx = Arc::new(PipelineContext {
        fetcher: Arc::new(StubFetcher),
        extractor: Arc::new(extractor),
        scorer: Arc::new(scorer),
        analyzer: Arc::new(analyzer),
        store,
        data_root: tmp.path().to_path_buf(),
        per_paper_wall_clock_secs: 5,
        max_paper_fanout: 1,
    });

    (ctx, tmp)
}

#[tokio::test]
async fn paper_above_both_thresholds_is_persisted() {
    let store = Arc::new(InMemoryStore::default());
    let (ctx, _tmp) = make_context(
        store.clone(),
        vec![ScoreResult::new(true, 0.9, "relevant abstract")],
        vec![ScoreResult::new(true, 0.85, "relevant full text")],
    );
    let orchestrator = Orchestrator::new(ctx);
    let config = default_current_config("t1", "task-one");
    let cancel = AtomicBool::new(false);

    let record = PaperRecord::new("2401.00001", "Title", "Abstract", "https://example.org/pdf");
    let summary = orchestrator.run(vec![record], &config, &cancel).await;

    assert_eq!(summary.total_seen, 1);
    assert_eq!(summary.persisted, 1);
    assert_eq!(summary.errors, 0);
    assert!(store
        .get_by_paper_id("2401.00001")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn paper_below_abstract_threshold_never_reaches_the_fetcher() {
    let store = Arc::new(InMemoryStore::default());
    let (ctx, _tmp) = make_context(
        store.clone(),
        vec![ScoreResult::new(false, 0.2, "not relevant")],
        vec![],
    );
    let orchestrator = Orchestrator::new(ctx);
    let config = default_current_config("t1", "task-one");
    let cancel = AtomicBool::new(false);

    let record = PaperRecord::new("2401.00002", "Title", "Abstract", "https://example.org/pdf");
    let summary = orchestrator.run(vec![record], &config, &cancel).await;

    assert_eq!(summary.persisted, 0);
    assert!(store
        .get_by_paper_id("2401.00002")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn already_stored_paper_id_is_skipped_not_counted_as_relevant() {
    let store = Arc::new(InMemoryStore::default());
    let existing = StoredPaper {
        paper_id: "2401.00003".to_string(),
        title: "Already stored".to_string(),
        abstract_text: String::new(),
        categories: vec![],
        authors: vec![],
        published_date: None,
        pdf_url: String::new(),
        abstract_score: None,
        abstract_justification: None,
        full_score: None,
        full_justification: None,
        final_score: None,
        final_is_relevant: false,
        processing_status: ProcessingStatus::Completed,
        deep_analysis_status: DeepAnalysisStatus::None,
        deep_analysis_result: None,
        task_name: "task-one".to_string(),
        task_id: "t1".to_string(),
        metadata: serde_json::json!({}),
        kb_export_status: None,
        kb_export_id: None,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
        analyzed_at: None,
    };
    store.rows.lock().unwrap().insert(existing.paper_id.clone(), existing);

    let (ctx, _tmp) = make_context(store.clone(), vec![], vec![]);
    let orchestrator = Orchestrator::new(ctx);
    let config = default_current_config("t1", "task-one");
    let cancel = AtomicBool::new(false);

    let record = PaperRecord::new("2401.00003", "Title", "Abstract", "https://example.org/pdf");
    let summary = orchestrator.run(vec![record], &config, &cancel).await;

    assert_eq!(summary.total_seen, 1);
    assert_eq!(summary.relevant, 0);
    assert_eq!(summary.persisted, 0);
}

#[tokio::test]
async fn pre_cancelled_run_processes_nothing() {
    let store = Arc::new(InMemoryStore::default());
    let (ctx, _tmp) = make_context(store.clone(), vec![], vec![]);
    let orchestrator = Orchestrator::new(ctx);
    let config = default_current_config("t1", "task-one");
    let cancel = AtomicBool::new(true);

    let record = PaperRecord::new("2401.00004", "Title", "Abstract", "https://example.org/pdf");
    let summary = orchestrator.run(vec![record], &config, &cancel).await;

    assert_eq!(summary.total_seen, 0);
}
