//! Persistent projection of a [`super::paper::PaperRecord`] (C7's row shape).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "pending" => Self::Pending,
            "processing" => Self::Processing,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "cancelled" => Self::Cancelled,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeepAnalysisStatus {
    None,
    Processing,
    Completed,
    Failed,
}

impl DeepAnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "none" => Self::None,
            "processing" => Self::Processing,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => return None,
        })
    }
}

/// Persistent, deduped-by-`paper_id` row. Constructed by the orchestrator from a
/// [`super::paper::PaperRecord`] at the PERSIST stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPaper {
    pub paper_id: String,
    pub title: String,
    pub abstract_text: String,
    pub categories: Vec<String>,
    pub authors: Vec<String>,
    pub published_date: Option<DateTime<Utc>>,
    pub pdf_url: String,

    pub abstract_score: Option<f64>,
    pub abstract_justification: Option<String>,
    pub full_score: Option<f64>,
    pub full_justification: Option<String>,
    pub final_score: Option<f64>,
    pub final_is_relevant: bool,

    pub processing_status: ProcessingStatus,
    pub deep_analysis_status: DeepAnalysisStatus,
    pub deep_analysis_result: Option<String>,

    pub task_name: String,
    pub task_id: String,
    pub metadata: serde_json::Value,

    pub kb_export_status: Option<String>,
    pub kb_export_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub analyzed_at: Option<DateTime<Utc>>,
}

impl StoredPaper {
    pub fn from_record(
        record: &crate::models::paper::PaperRecord,
        task_name: &str,
        task_id: &str,
    ) -> Self {
        let now = Utc::now();
        Self {
            paper_id: record.paper_id.clone(),
            title: record.title.clone(),
            abstract_text: record.abstract_text.clone(),
            categories: record.categories.clone(),
            authors: record.authors.clone(),
            published_date: record.published_date,
            pdf_url: record.pdf_url.clone(),
            abstract_score: record.abstract_score,
            abstract_justification: record.abstract_justification.clone(),
            full_score: record.full_score,
            full_justification: record.full_justification.clone(),
            final_score: record.final_score,
            final_is_relevant: record.final_is_relevant,
            processing_status: ProcessingStatus::Completed,
            deep_analysis_status: if !record.deep_analyzed {
                DeepAnalysisStatus::None
            } else if record.deep_success {
                DeepAnalysisStatus::Completed
            } else {
                DeepAnalysisStatus::Failed
            },
            deep_analysis_result: record.deep_report_markdown.clone(),
            task_name: task_name.to_string(),
            task_id: task_id.to_string(),
            metadata: serde_json::json!({}),
            kb_export_status: None,
            kb_export_id: None,
            created_at: now,
            updated_at: now,
            analyzed_at: if record.deep_analyzed { Some(now) } else { None },
        }
    }
}
