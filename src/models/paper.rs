//! Paper Record (C1): the in-memory per-paper state carrier threaded through the
//! pipeline.
//!
//! Created by the index client from one feed entry, mutated in place by the
//! orchestrator, and destroyed at pipeline end after [`PaperRecord::cleanup`] nulls
//! its heavy buffers. Stage flags are set only by the orchestrator -- nothing else in
//! the crate should probe for "has this field been set" as a proxy for pipeline
//! progress.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// Bibliographic and derived state for one candidate paper.
#[derive(Debug, Clone)]
pub struct PaperRecord {
    pub paper_id: String,
    pub title: String,
    pub abstract_text: String,
    pub categories: Vec<String>,
    pub authors: Vec<String>,
    pub published_date: Option<DateTime<Utc>>,
    pub pdf_url: String,

    /// Present only between fetch and OCR.
    pub pdf_bytes: Option<bytes::Bytes>,
    /// Present only between OCR and deep analysis.
    pub ocr_text: Option<String>,
    /// Byproduct of structured OCR; relative path -> image bytes.
    pub ocr_images: Option<HashMap<String, Vec<u8>>>,

    pub abstract_score: Option<f64>,
    pub abstract_justification: Option<String>,
    pub full_score: Option<f64>,
    pub full_justification: Option<String>,
    pub final_score: Option<f64>,
    pub final_is_relevant: bool,

    pub persisted: bool,
    pub full_analyzed: bool,
    pub deep_analyzed: bool,
    pub deep_success: bool,

    pub deep_report_markdown: Option<String>,
}

impl PaperRecord {
    pub fn new(
        paper_id: impl Into<String>,
        title: impl Into<String>,
        abstract_text: impl Into<String>,
        pdf_url: impl Into<String>,
    ) -> Self {
        Self {
            paper_id: paper_id.into(),
            title: title.into(),
            abstract_text: abstract_text.into(),
            categories: Vec::new(),
            authors: Vec::new(),
            published_date: None,
            pdf_url: pdf_url.into(),
            pdf_bytes: None,
            ocr_text: None,
            ocr_images: None,
            abstract_score: None,
            abstract_justification: None,
            full_score: None,
            full_justification: None,
            final_score: None,
            final_is_relevant: false,
            persisted: false,
            full_analyzed: false,
            deep_analyzed: false,
            deep_success: false,
            deep_report_markdown: None,
        }
    }

    /// Null every "optional, large" field. Called by the orchestrator on leaving any
    /// terminal state. Bibliographic and scoring fields are left intact so the run
    /// summary can still describe what happened to this paper.
    pub fn cleanup(&mut self) {
        self.pdf_bytes = None;
        self.ocr_text = None;
        self.ocr_images = None;
    }

    /// Invariant check used by tests and defensively before persistence:
    /// `full_score` present implies `abstract_score` cleared the full-scoring
    /// threshold.
    pub fn full_score_respects_threshold(&self, threshold_for_full_scoring: f64) -> bool {
        match (self.full_score, self.abstract_score) {
            (Some(_), Some(abstract_score)) => abstract_score >= threshold_for_full_scoring,
            (Some(_), None) => false,
            (None, _) => true,
        }
    }

    pub fn deep_report_respects_threshold(&self, threshold_for_deep_analysis: f64) -> bool {
        match (self.deep_report_markdown.as_ref(), self.full_score) {
            (Some(_), Some(full_score)) => full_score >= threshold_for_deep_analysis,
            (Some(_), None) => false,
            (None, _) => true,
        }
    }

    pub fn is_terminal_clean(&self) -> bool {
        self.pdf_bytes.is_none() && self.ocr_text.is_none() && self.ocr_images.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleanup_nulls_only_large_optional_fields() {
        let mut record = PaperRecord::new("2401.00001", "Title", "Abstract", "https://x/pdf");
        record.pdf_bytes = Some(bytes::Bytes::from_static(b"%PDF"));
        record.ocr_text = Some("full text".to_string());
        record.ocr_images = Some(HashMap::from([("imgs/a.png".to_string(), vec![1, 2, 3])]));
        record.abstract_score = Some(0.9);

        record.cleanup();

        assert!(record.is_terminal_clean());
        assert_eq!(record.abstract_score, Some(0.9));
        assert_eq!(record.title, "Title");
    }

    #[test]
    fn threshold_invariants_hold_by_construction() {
        let mut record = PaperRecord::new("id", "t", "a", "u");
        record.abstract_score = Some(0.5);
        record.full_score = Some(0.8);
        assert!(!record.full_score_respects_threshold(0.7));
        assert!(record.full_score_respects_threshold(0.4));
    }
}
