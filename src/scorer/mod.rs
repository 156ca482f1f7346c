//! Relevance Scorer (C5): LLM-backed abstract/full-text scoring.
//!
//! The two operations share a contract; only the input text differs. The orchestrator
//! is responsible for truncating full-text input to `ocr_char_limit` before calling
//! `score_full` -- the scorer itself never truncates.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::rate_limit::RateLimiters;

#[derive(Debug, Clone)]
pub struct ScoreResult {
    pub is_relevant: bool,
    pub score: f64,
    pub justification: String,
}

impl ScoreResult {
    pub fn new(is_relevant: bool, score: f64, justification: impl Into<String>) -> Result<Self> {
        if !(0.0..=1.0).contains(&score) || !score.is_finite() {
            return Err(Error::ScoringFailed {
                paper_id: String::new(),
                detail: format!("score {score} out of range [0,1]"),
            });
        }
        Ok(Self {
            is_relevant,
            score,
            justification: justification.into(),
        })
    }
}

/// Opaque model handle. A real implementation talks to an external LLM provider; this
/// crate only defines the seam plus a canned backend for tests.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn judge_relevance(
        &self,
        model: &str,
        text: &str,
        requirements: &str,
    ) -> Result<ScoreResult>;
}

pub struct RelevanceScorer {
    backend: std::sync::Arc<dyn LlmBackend>,
    limiters: RateLimiters,
    timeout: Duration,
}

impl RelevanceScorer {
    pub fn new(
        backend: std::sync::Arc<dyn LlmBackend>,
        limiters: RateLimiters,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            limiters,
            timeout,
        }
    }

    pub async fn score_abstract(
        &self,
        paper_id: &str,
        model: &str,
        abstract_text: &str,
        requirements: &str,
    ) -> Result<ScoreResult> {
        self.limiters.acquire(model).await;
        tokio::time::timeout(
            self.timeout,
            self.backend.judge_relevance(model, abstract_text, requirements),
        )
        .await
        .map_err(|_| Error::ScoringFailed {
            paper_id: paper_id.to_string(),
            detail: "abstract scoring timed out".to_string(),
        })?
        .map_err(|_| Error::ScoringFailed {
            paper_id: paper_id.to_string(),
            detail: "abstract scoring backend failed".to_string(),
        })
    }

    pub async fn score_full(
        &self,
        paper_id: &str,
        model: &str,
        text_excerpt: &str,
        requirements: &str,
    ) -> Result<ScoreResult> {
        self.limiters.acquire(model).await;
        tokio::time::timeout(
            self.timeout,
            self.backend.judge_relevance(model, text_excerpt, requirements),
        )
        .await
        .map_err(|_| Error::ScoringFailed {
            paper_id: paper_id.to_string(),
            detail: "full-text scoring timed out".to_string(),
        })?
        .map_err(|_| Error::ScoringFailed {
            paper_id: paper_id.to_string(),
            detail: "full-text scoring backend failed".to_string(),
        })
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic backend returning a fixed queue of results in call order.
    pub struct ScriptedBackend {
        results: std::sync::Mutex<Vec<Result<ScoreResult>>>,
        calls: AtomicUsize,
    }

    impl ScriptedBackend {
        pub fn new(mut results: Vec<Result<ScoreResult>>) -> Self {
            results.reverse();
            Self {
                results: std::sync::Mutex::new(results),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmBackend for ScriptedBackend {
        async fn judge_relevance(
            &self,
            _model: &str,
            _text: &str,
            _requirements: &str,
        ) -> Result<ScoreResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.results
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(Error::ScoringFailed {
                    paper_id: String::new(),
                    detail: "no scripted result left".to_string(),
                }))
        }
    }
}
