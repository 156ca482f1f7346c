//! Pipeline Orchestrator (C8): per-paper staged execution with thresholds and
//! cleanup. The hardest subsystem in the crate -- see SPEC_FULL.md §4.7 for the
//! binding state machine this module implements verbatim.

mod stage;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::analyzer::DeepAnalyzer;
use crate::config::TaskConfig;
use crate::error::{Error, Result};
use crate::extractor::TextExtractor;
use crate::fetcher::Fetcher;
use crate::models::stored_paper::{DeepAnalysisStatus as StoredDeepStatus, ProcessingStatus};
use crate::models::{PaperRecord, StoredPaper};
use crate::paths::PaperDir;
use crate::scorer::RelevanceScorer;
use crate::store::PaperStore;

pub use stage::StageOutcome;

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct RunSummary {
    pub total_seen: usize,
    pub relevant: usize,
    pub persisted: usize,
    pub deep_analyzed: usize,
    pub errors: usize,
}

/// The dependency context the orchestrator needs, per the "replace global singletons
/// with a context object" design note. Constructed once at process start and shared
/// by the scheduler across runs.
pub struct PipelineContext {
    pub fetcher: Arc<dyn Fetcher>,
    pub extractor: Arc<TextExtractor>,
    pub scorer: Arc<RelevanceScorer>,
    pub analyzer: Arc<DeepAnalyzer>,
    pub store: Arc<dyn PaperStore>,
    pub data_root: std::path::PathBuf,
    pub per_paper_wall_clock_secs: u64,
    /// Bounded number of per-paper pipelines allowed to run concurrently within one
    /// run; writes for the same `paper_id` are never interleaved since each
    /// candidate owns a distinct `paper_id`. `1` reproduces strictly sequential
    /// processing.
    pub max_paper_fanout: usize,
}

pub struct Orchestrator {
    ctx: Arc<PipelineContext>,
}

impl Orchestrator {
    pub fn new(ctx: Arc<PipelineContext>) -> Self {
        Self { ctx }
    }

    /// Walk every candidate through the staged pipeline, with up to
    /// `ctx.max_paper_fanout` running concurrently, honoring cancellation at the
    /// start of each per-paper task. `max_paper_fanout == 1` drives candidates one
    /// at a time, identical in effect to strictly sequential processing.
    pub async fn run(
        &self,
        candidates: Vec<PaperRecord>,
        config: &TaskConfig,
        cancel: &AtomicBool,
    ) -> RunSummary {
        let mut summary = RunSummary::default();
        let fanout = self.ctx.max_paper_fanout.max(1);
        let budget = Duration::from_secs(self.ctx.per_paper_wall_clock_secs);

        let outcomes = stream::iter(candidates)
            .map(|mut record| async move {
                if cancel.load(Ordering::SeqCst) {
                    return (record, None);
                }
                let outcome =
                    tokio::time::timeout(budget, self.run_one(&mut record, config, cancel)).await;
                (record, Some(outcome))
            })
            .buffer_unordered(fanout)
            .collect::<Vec<_>>()
            .await;

        for (mut record, outcome) in outcomes {
            match outcome {
                None => {
                    info!(task_id = %config.task_id, "cancellation observed before paper started");
                }
                Some(Ok(Ok(PaperOutcome::Persisted { deep_analyzed }))) => {
                    summary.total_seen += 1;
                    summary.relevant += 1;
                    summary.persisted += 1;
                    if deep_analyzed {
                        summary.deep_analyzed += 1;
                    }
                }
                Some(Ok(Ok(PaperOutcome::Discarded))) | Some(Ok(Ok(PaperOutcome::Skipped))) => {
                    summary.total_seen += 1;
                }
                Some(Ok(Err(e))) => {
                    summary.total_seen += 1;
                    warn!(paper_id = %record.paper_id, error = %e, "per-paper pipeline error");
                    summary.errors += 1;
                }
                Some(Err(_)) => {
                    summary.total_seen += 1;
                    warn!(paper_id = %record.paper_id, "per-paper wall-clock budget exceeded");
                    summary.errors += 1;
                }
            }

            record.cleanup();
        }

        summary
    }

    /// Drive one paper through the state machine. Returns `Ok` for every outcome that
    /// is not itself an unrecoverable error -- DEDUPE hits and below-threshold
    /// discards are not errors, they are expected stage outcomes.
    async fn run_one(
        &self,
        record: &mut PaperRecord,
        config: &TaskConfig,
        cancel: &AtomicBool,
    ) -> Result<PaperOutcome> {
        // DEDUPE
        if self.ctx.store.get_by_paper_id(&record.paper_id).await?.is_some() {
            return Ok(PaperOutcome::Skipped);
        }

        // ABSTRACT_SCORED
        let abstract_outcome = StageOutcome::from_result(
            self.ctx
                .scorer
                .score_abstract(
                    &record.paper_id,
                    &config.abstract_analysis_model,
                    &record.abstract_text,
                    &config.user_requirements,
                )
                .await,
        )
        .skip_unless("below_persist_threshold", |r| {
            r.is_relevant && r.score >= config.persist_threshold
        });

        let abstract_result = match abstract_outcome {
            StageOutcome::Done(r) => r,
            StageOutcome::Skip(_) | StageOutcome::Fail(_) => return Ok(PaperOutcome::Discarded),
        };

        record.abstract_score = Some(abstract_result.score);
        record.abstract_justification = Some(abstract_result.justification.clone());

        if cancel.load(Ordering::SeqCst) {
            return Err(Error::Cancelled);
        }

        // FETCHING
        let paper_dir = PaperDir::new(&self.ctx.data_root, &record.paper_id);
        paper_dir
            .ensure_dirs()
            .await
            .map_err(|e| Error::FetchFailed {
                paper_id: record.paper_id.clone(),
                detail: e.to_string(),
            })?;

        let pdf_bytes = match self
            .ctx
            .fetcher
            .fetch(record, &paper_dir, true, None)
            .await
        {
            Ok(bytes) => bytes,
            Err(_) => {
                paper_dir.remove_all().await.ok();
                return Ok(PaperOutcome::Discarded);
            }
        };
        record.pdf_bytes = Some(pdf_bytes.clone());

        if cancel.load(Ordering::SeqCst) {
            return Err(Error::Cancelled);
        }

        // OCRING -- fast mode first, one structured-mode retry on failure. Per
        // SPEC_FULL.md §12.1, the abstract-score decision above is final regardless
        // of which mode eventually produces the text.
        let (ocr_text, images) = match self
            .ctx
            .extractor
            .extract_fast(&record.paper_id, &pdf_bytes, 25)
            .await
        {
            Ok((text, _status)) => {
                tokio::fs::write(paper_dir.fast_ocr_path(), &text)
                    .await
                    .map_err(|e| Error::OcrFailed {
                        paper_id: record.paper_id.clone(),
                        detail: e.to_string(),
                    })?;
                (text, None)
            }
            Err(_) => match self
                .ctx
                .extractor
                .extract_structured(&record.paper_id, &pdf_bytes, 25)
                .await
            {
                Ok(structured) => {
                    tokio::fs::write(paper_dir.structured_ocr_path(), &structured.markdown)
                        .await
                        .map_err(|e| Error::OcrFailed {
                            paper_id: record.paper_id.clone(),
                            detail: e.to_string(),
                        })?;
                    for (name, bytes) in &structured.images {
                        let stripped = name.strip_prefix("imgs/").unwrap_or(name);
                        tokio::fs::write(paper_dir.image_path(stripped), bytes)
                            .await
                            .map_err(|e| Error::OcrFailed {
                                paper_id: record.paper_id.clone(),
                                detail: e.to_string(),
                            })?;
                    }
                    (structured.markdown.clone(), Some(structured.images))
                }
                Err(_) => {
                    paper_dir.remove_all().await.ok();
                    return Ok(PaperOutcome::Discarded);
                }
            },
        };

        record.ocr_text = Some(ocr_text.clone());
        record.ocr_images = images;

        if cancel.load(Ordering::SeqCst) {
            return Err(Error::Cancelled);
        }

        // FULL_SCORED -- truncate only for the scorer call (§12.2); the bundle on
        // disk keeps the untruncated text.
        let truncated: String = ocr_text.chars().take(config.ocr_char_limit).collect();
        let full_outcome = StageOutcome::from_result(
            self.ctx
                .scorer
                .score_full(
                    &record.paper_id,
                    &config.full_paper_analysis_model,
                    &truncated,
                    &config.user_requirements,
                )
                .await,
        );

        let full_result = match &full_outcome {
            StageOutcome::Done(r) => r.clone(),
            StageOutcome::Skip(_) | StageOutcome::Fail(_) => {
                paper_dir.remove_all().await.ok();
                return Ok(PaperOutcome::Discarded);
            }
        };

        record.full_score = Some(full_result.score);
        record.full_justification = Some(full_result.justification.clone());
        record.full_analyzed = true;
        record.final_score = Some(full_result.score);
        record.final_is_relevant = full_result.is_relevant;

        let full_outcome = StageOutcome::Done(full_result.clone())
            .skip_unless("below_persist_threshold", |r| {
                r.is_relevant && r.score >= config.persist_threshold
            });
        if !full_outcome.is_done() {
            paper_dir.remove_all().await.ok();
            return Ok(PaperOutcome::Discarded);
        }

        // DEEP_ANALYZING (optional)
        let mut deep_analyzed = false;
        if config.enable_deep_analysis && full_result.score >= config.deep_threshold {
            record.deep_analyzed = true;
            let thread_id = DeepAnalyzer::thread_id(&record.paper_id, chrono::Utc::now());
            match self
                .ctx
                .analyzer
                .analyze(
                    &record.paper_id,
                    &config.deep_analysis_model,
                    &config.vision_model_name,
                    &paper_dir,
                    &thread_id,
                    record.published_date,
                )
                .await
            {
                Ok((_, markdown)) => {
                    tokio::fs::write(paper_dir.analysis_path(), &markdown)
                        .await
                        .ok();
                    record.deep_report_markdown = Some(markdown);
                    record.deep_success = true;
                    deep_analyzed = true;
                }
                Err(e) => {
                    warn!(paper_id = %record.paper_id, error = %e, "deep analysis failed, persisting anyway");
                    record.deep_success = false;
                }
            }
        }

        // PERSIST
        let stored = StoredPaper::from_record(record, &config.task_name, &config.task_id);
        match self.ctx.store.create(&stored).await {
            Ok(true) => {
                record.persisted = true;
            }
            Ok(false) => {
                // Lost a race with a concurrent duplicate create; treat as dedupe.
                return Ok(PaperOutcome::Skipped);
            }
            Err(e) => {
                warn!(paper_id = %record.paper_id, error = %e, "persist failed");
                paper_dir.remove_all().await.ok();
                return Ok(PaperOutcome::Discarded);
            }
        }

        let deep_status = if !record.deep_analyzed {
            None
        } else if record.deep_success {
            Some(StoredDeepStatus::Completed)
        } else {
            Some(StoredDeepStatus::Failed)
        };
        self.ctx
            .store
            .update_status(&record.paper_id, ProcessingStatus::Completed, deep_status)
            .await
            .ok();

        Ok(PaperOutcome::Persisted { deep_analyzed })
    }

    /// Re-run deep analysis for an already-persisted paper: no dedupe, fetch, OCR, or
    /// relevance scoring, since the paper is already known relevant. The PDF and OCR
    /// bundle must still be present on disk from the original run.
    pub async fn reanalyze(
        &self,
        paper_id: &str,
        model: &str,
        vision_model: &str,
    ) -> Result<String> {
        let stored = self
            .ctx
            .store
            .get_by_paper_id(paper_id)
            .await?
            .ok_or_else(|| Error::PersistFailed {
                paper_id: paper_id.to_string(),
                detail: "no stored paper with this id".to_string(),
            })?;

        let paper_dir = PaperDir::new(&self.ctx.data_root, paper_id);
        let thread_id = DeepAnalyzer::thread_id(paper_id, chrono::Utc::now());

        let (_, markdown) = self
            .ctx
            .analyzer
            .analyze(
                paper_id,
                model,
                vision_model,
                &paper_dir,
                &thread_id,
                stored.published_date,
            )
            .await?;

        tokio::fs::write(paper_dir.analysis_path(), &markdown)
            .await
            .map_err(|e| Error::AnalysisFailed {
                paper_id: paper_id.to_string(),
                detail: e.to_string(),
            })?;

        self.ctx.store.save_analysis_result(paper_id, &markdown).await?;

        Ok(markdown)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PaperOutcome {
    Skipped,
    Discarded,
    Persisted { deep_analyzed: bool },
}

#[cfg(test)]
mod tests;
