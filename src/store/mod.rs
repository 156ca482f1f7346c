//! Paper Store (C7): idempotent persistence, deduped by `paper_id`.

mod global_settings;
mod migrations;
mod models;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::RunQueryDsl;
use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;

use crate::error::{Error, Result};
use crate::models::{DeepAnalysisStatus, ProcessingStatus, StoredPaper};
use crate::schema::papers;

pub use global_settings::{load as load_global_settings, save as save_global_settings};
pub use migrations::run_pending as run_pending_migrations;
pub use models::{NewPaperRow, PaperRow};

pub type DbConnection = SyncConnectionWrapper<SqliteConnection>;
pub type DbPool = Pool<DbConnection>;

#[async_trait]
pub trait PaperStore: Send + Sync {
    async fn get_by_paper_id(&self, paper_id: &str) -> Result<Option<StoredPaper>>;
    /// Returns `false` (not an error) when `paper_id` already exists -- idempotent
    /// under a concurrent duplicate.
    async fn create(&self, stored: &StoredPaper) -> Result<bool>;
    async fn update_status(
        &self,
        paper_id: &str,
        processing_status: ProcessingStatus,
        deep_analysis_status: Option<DeepAnalysisStatus>,
    ) -> Result<()>;
    async fn save_analysis_result(&self, paper_id: &str, markdown: &str) -> Result<()>;
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<StoredPaper>>;
    async fn search(&self, query: &str, limit: i64) -> Result<Vec<StoredPaper>>;
    async fn delete(&self, paper_id: &str) -> Result<bool>;
    async fn bulk_reassign_task(
        &self,
        paper_ids: &[String],
        new_task_name: &str,
        new_task_id: Option<&str>,
    ) -> Result<usize>;
}

/// `diesel-async` + SQLite backed implementation, grounded on the async pooled
/// connection pattern used elsewhere in this crate's ancestry.
pub struct DieselPaperStore {
    pool: DbPool,
}

impl DieselPaperStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn from_database_url(database_url: &str) -> Result<Self> {
        let manager = AsyncDieselConnectionManager::<DbConnection>::new(database_url);
        let pool = Pool::builder(manager)
            .build()
            .map_err(|e| Error::Pool(e.to_string()))?;
        Ok(Self::new(pool))
    }

    async fn conn(
        &self,
    ) -> Result<diesel_async::pooled_connection::deadpool::Object<DbConnection>> {
        self.pool.get().await.map_err(|e| Error::Pool(e.to_string()))
    }
}

#[async_trait]
impl PaperStore for DieselPaperStore {
    async fn get_by_paper_id(&self, paper_id: &str) -> Result<Option<StoredPaper>> {
        let mut conn = self.conn().await?;
        let row: Option<PaperRow> = papers::table
            .filter(papers::paper_id.eq(paper_id))
            .select(PaperRow::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        row.map(|r| r.into_stored()).transpose()
    }

    async fn create(&self, stored: &StoredPaper) -> Result<bool> {
        let mut conn = self.conn().await?;
        let new_row = NewPaperRow::from_stored(stored)?;

        let result = diesel::insert_into(papers::table)
            .values(&new_row)
            .execute(&mut conn)
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            )) => Ok(false),
            Err(e) => Err(Error::Database(e)),
        }
    }

    async fn update_status(
        &self,
        paper_id: &str,
        processing_status: ProcessingStatus,
        deep_analysis_status: Option<DeepAnalysisStatus>,
    ) -> Result<()> {
        let mut conn = self.conn().await?;
        let now = chrono::Utc::now().naive_utc();
        let deep_analysis_status = deep_analysis_status
            .map(|s| s.as_str())
            .unwrap_or(DeepAnalysisStatus::None.as_str());

        diesel::update(papers::table.filter(papers::paper_id.eq(paper_id)))
            .set((
                papers::processing_status.eq(processing_status.as_str()),
                papers::deep_analysis_status.eq(deep_analysis_status),
                papers::updated_at.eq(now),
            ))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    async fn save_analysis_result(&self, paper_id: &str, markdown: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        let now = chrono::Utc::now().naive_utc();

        diesel::update(papers::table.filter(papers::paper_id.eq(paper_id)))
            .set((
                papers::deep_analysis_result.eq(markdown),
                papers::deep_analysis_status.eq(DeepAnalysisStatus::Completed.as_str()),
                papers::analyzed_at.eq(now),
                papers::updated_at.eq(now),
            ))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<StoredPaper>> {
        let mut conn = self.conn().await?;
        let rows: Vec<PaperRow> = papers::table
            .order(papers::created_at.desc())
            .limit(limit)
            .offset(offset)
            .select(PaperRow::as_select())
            .load(&mut conn)
            .await?;
        rows.into_iter().map(|r| r.into_stored()).collect()
    }

    async fn search(&self, query: &str, limit: i64) -> Result<Vec<StoredPaper>> {
        let mut conn = self.conn().await?;
        let pattern = format!("%{query}%");
        let rows: Vec<PaperRow> = papers::table
            .filter(
                papers::title
                    .like(pattern.clone())
                    .or(papers::abstract_text.like(pattern)),
            )
            .order(papers::created_at.desc())
            .limit(limit)
            .select(PaperRow::as_select())
            .load(&mut conn)
            .await?;
        rows.into_iter().map(|r| r.into_stored()).collect()
    }

    async fn delete(&self, paper_id: &str) -> Result<bool> {
        let mut conn = self.conn().await?;
        let affected =
            diesel::delete(papers::table.filter(papers::paper_id.eq(paper_id)))
                .execute(&mut conn)
                .await?;
        Ok(affected > 0)
    }

    async fn bulk_reassign_task(
        &self,
        paper_ids: &[String],
        new_task_name: &str,
        new_task_id: Option<&str>,
    ) -> Result<usize> {
        let mut conn = self.conn().await?;
        let now = chrono::Utc::now().naive_utc();

        let affected = if let Some(task_id) = new_task_id {
            diesel::update(papers::table.filter(papers::paper_id.eq_any(paper_ids)))
                .set((
                    papers::task_name.eq(new_task_name),
                    papers::task_id.eq(task_id),
                    papers::updated_at.eq(now),
                ))
                .execute(&mut conn)
                .await?
        } else {
            diesel::update(papers::table.filter(papers::paper_id.eq_any(paper_ids)))
                .set((
                    papers::task_name.eq(new_task_name),
                    papers::updated_at.eq(now),
                ))
                .execute(&mut conn)
                .await?
        };

        Ok(affected)
    }
}
