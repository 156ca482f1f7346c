//! Diesel row types for the `papers` table, and conversions to/from
//! [`crate::models::StoredPaper`].

use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;

use crate::error::{Error, Result};
use crate::models::{DeepAnalysisStatus, ProcessingStatus, StoredPaper};
use crate::schema::papers;

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = papers)]
pub struct PaperRow {
    pub id: i32,
    pub paper_id: String,
    pub title: String,
    pub abstract_text: String,
    pub categories: String,
    pub authors: String,
    pub published_date: Option<NaiveDateTime>,
    pub pdf_url: String,
    pub abstract_score: Option<f64>,
    pub abstract_justification: Option<String>,
    pub full_score: Option<f64>,
    pub full_justification: Option<String>,
    pub final_score: Option<f64>,
    pub final_is_relevant: bool,
    pub processing_status: String,
    pub deep_analysis_status: String,
    pub deep_analysis_result: Option<String>,
    pub task_name: String,
    pub task_id: String,
    pub metadata: String,
    pub kb_export_status: Option<String>,
    pub kb_export_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub analyzed_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = papers)]
pub struct NewPaperRow {
    pub paper_id: String,
    pub title: String,
    pub abstract_text: String,
    pub categories: String,
    pub authors: String,
    pub published_date: Option<NaiveDateTime>,
    pub pdf_url: String,
    pub abstract_score: Option<f64>,
    pub abstract_justification: Option<String>,
    pub full_score: Option<f64>,
    pub full_justification: Option<String>,
    pub final_score: Option<f64>,
    pub final_is_relevant: bool,
    pub processing_status: String,
    pub deep_analysis_status: String,
    pub deep_analysis_result: Option<String>,
    pub task_name: String,
    pub task_id: String,
    pub metadata: String,
    pub kb_export_status: Option<String>,
    pub kb_export_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub analyzed_at: Option<NaiveDateTime>,
}

impl NewPaperRow {
    pub fn from_stored(stored: &StoredPaper) -> Result<Self> {
        Ok(Self {
            paper_id: stored.paper_id.clone(),
            title: stored.title.clone(),
            abstract_text: stored.abstract_text.clone(),
            categories: serde_json::to_string(&stored.categories)?,
            authors: serde_json::to_string(&stored.authors)?,
            published_date: stored.published_date.map(|d| d.naive_utc()),
            pdf_url: stored.pdf_url.clone(),
            abstract_score: stored.abstract_score,
            abstract_justification: stored.abstract_justification.clone(),
            full_score: stored.full_score,
            full_justification: stored.full_justification.clone(),
            final_score: stored.final_score,
            final_is_relevant: stored.final_is_relevant,
            processing_status: stored.processing_status.as_str().to_string(),
            deep_analysis_status: stored.deep_analysis_status.as_str().to_string(),
            deep_analysis_result: stored.deep_analysis_result.clone(),
            task_name: stored.task_name.clone(),
            task_id: stored.task_id.clone(),
            metadata: serde_json::to_string(&stored.metadata)?,
            kb_export_status: stored.kb_export_status.clone(),
            kb_export_id: stored.kb_export_id.clone(),
            created_at: stored.created_at.naive_utc(),
            updated_at: stored.updated_at.naive_utc(),
            analyzed_at: stored.analyzed_at.map(|d| d.naive_utc()),
        })
    }
}

impl PaperRow {
    pub fn into_stored(self) -> Result<StoredPaper> {
        Ok(StoredPaper {
            paper_id: self.paper_id,
            title: self.title,
            abstract_text: self.abstract_text,
            categories: serde_json::from_str(&self.categories)?,
            authors: serde_json::from_str(&self.authors)?,
            published_date: self
                .published_date
                .map(|d| DateTime::<Utc>::from_naive_utc_and_offset(d, Utc)),
            pdf_url: self.pdf_url,
            abstract_score: self.abstract_score,
            abstract_justification: self.abstract_justification,
            full_score: self.full_score,
            full_justification: self.full_justification,
            final_score: self.final_score,
            final_is_relevant: self.final_is_relevant,
            processing_status: ProcessingStatus::from_str(&self.processing_status)
                .ok_or_else(|| Error::Database(diesel::result::Error::NotFound))?,
            deep_analysis_status: DeepAnalysisStatus::from_str(&self.deep_analysis_status)
                .ok_or_else(|| Error::Database(diesel::result::Error::NotFound))?,
            deep_analysis_result: self.deep_analysis_result,
            task_name: self.task_name,
            task_id: self.task_id,
            metadata: serde_json::from_str(&self.metadata)?,
            kb_export_status: self.kb_export_status,
            kb_export_id: self.kb_export_id,
            created_at: DateTime::<Utc>::from_naive_utc_and_offset(self.created_at, Utc),
            updated_at: DateTime::<Utc>::from_naive_utc_and_offset(self.updated_at, Utc),
            analyzed_at: self
                .analyzed_at
                .map(|d| DateTime::<Utc>::from_naive_utc_and_offset(d, Utc)),
        })
    }
}
