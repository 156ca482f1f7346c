//! Deep Analyzer (C6): LLM+vision agent producing a long-form markdown report.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::paths::PaperDir;
use crate::rate_limit::RateLimiters;

#[derive(Debug, Clone, Default)]
pub struct StructuredResult {
    pub summary: String,
    pub key_findings: Vec<String>,
}

/// Opaque LLM+vision agent workflow. A real implementation reads `paper_dir`'s OCR
/// markdown and `imgs/` subdirectory; this crate only defines the seam.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    async fn analyze(
        &self,
        model: &str,
        vision_model: &str,
        paper_dir: &PaperDir,
        thread_id: &str,
    ) -> Result<(StructuredResult, String)>;
}

pub struct DeepAnalyzer {
    backend: std::sync::Arc<dyn AnalysisBackend>,
    limiters: RateLimiters,
    timeout: Duration,
}

impl DeepAnalyzer {
    pub fn new(
        backend: std::sync::Arc<dyn AnalysisBackend>,
        limiters: RateLimiters,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            limiters,
            timeout,
        }
    }

    /// Builds the thread id exactly as the original source did:
    /// `paper_gather_{paper_id}_{run_started_at_unix}`.
    pub fn thread_id(paper_id: &str, run_started_at: DateTime<Utc>) -> String {
        format!("paper_gather_{paper_id}_{}", run_started_at.timestamp())
    }

    pub async fn analyze(
        &self,
        paper_id: &str,
        model: &str,
        vision_model: &str,
        paper_dir: &PaperDir,
        thread_id: &str,
        published_date: Option<DateTime<Utc>>,
    ) -> Result<(StructuredResult, String)> {
        self.limiters.acquire(model).await;

        let (structured, mut markdown) = tokio::time::timeout(
            self.timeout,
            self.backend.analyze(model, vision_model, paper_dir, thread_id),
        )
        .await
        .map_err(|_| Error::AnalysisFailed {
            paper_id: paper_id.to_string(),
            detail: "deep analysis timed out".to_string(),
        })?
        .map_err(|e| Error::AnalysisFailed {
            paper_id: paper_id.to_string(),
            detail: e.to_string(),
        })?;

        markdown.push_str(&footer(published_date));

        Ok((structured, markdown))
    }
}

fn footer(published_date: Option<DateTime<Utc>>) -> String {
    let date_str = published_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown".to_string());
    format!(
        "\n\n---\n\n**Publication date**: {date_str}\n\n---\n*This analysis was generated by an automated pipeline.*\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoBackend;

    #[async_trait]
    impl AnalysisBackend for EchoBackend {
        async fn analyze(
            &self,
            _model: &str,
            _vision_model: &str,
            _paper_dir: &PaperDir,
            thread_id: &str,
        ) -> Result<(StructuredResult, String)> {
            Ok((
                StructuredResult::default(),
                format!("# Analysis for {thread_id}"),
            ))
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl AnalysisBackend for FailingBackend {
        async fn analyze(
            &self,
            _model: &str,
            _vision_model: &str,
            _paper_dir: &PaperDir,
            _thread_id: &str,
        ) -> Result<(StructuredResult, String)> {
            Err(Error::AnalysisFailed {
                paper_id: "x".to_string(),
                detail: "agent unavailable".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn footer_is_appended_by_the_orchestrator_seam_not_the_backend() {
        let analyzer = DeepAnalyzer::new(
            std::sync::Arc::new(EchoBackend),
            RateLimiters::unlimited(),
            Duration::from_secs(5),
        );
        let tmp = tempfile::tempdir().unwrap();
        let dir = PaperDir::new(tmp.path(), "2401.00001");
        let (_, markdown) = analyzer
            .analyze("gpt-4o", "gpt-4o", &dir, "thread-1", None)
            .await
            .unwrap();
        assert!(markdown.starts_with("# Analysis for thread-1"));
        assert!(markdown.contains("Publication date"));
    }

    #[tokio::test]
    async fn backend_failure_maps_to_analysis_failed() {
        let analyzer = DeepAnalyzer::new(
            std::sync::Arc::new(FailingBackend),
            RateLimiters::unlimited(),
            Duration::from_secs(5),
        );
        let tmp = tempfile::tempdir().unwrap();
        let dir = PaperDir::new(tmp.path(), "2401.00001");
        let result = analyzer
            .analyze("gpt-4o", "gpt-4o", &dir, "thread-1", None)
            .await;
        assert!(matches!(result, Err(Error::AnalysisFailed { .. })));
    }

    #[test]
    fn thread_id_matches_original_scheme() {
        let ts = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            DeepAnalyzer::thread_id("2401.00001", ts),
            format!("paper_gather_2401.00001_{}", ts.timestamp())
        );
    }
}
