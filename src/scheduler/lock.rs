//! Overlap guard: one row per task in `scheduled_run_locks`, claimed by unique-key
//! insert and released by delete. Grounded on the "claim via guarded insert" pattern
//! for single-writer work queues: a concurrent trigger for the same task loses the
//! insert's unique-constraint race instead of needing a separate advisory lock.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::error::{Error, Result};
use crate::schema::scheduled_run_locks;
use crate::store::DbPool;

#[derive(Insertable)]
#[diesel(table_name = scheduled_run_locks)]
struct NewLock<'a> {
    task_id: &'a str,
    run_id: &'a str,
    started_at: chrono::NaiveDateTime,
}

/// Held for the duration of one scheduled run. Must be released explicitly with
/// [`RunLock::release`] -- releasing requires an async DB call, so it cannot happen in
/// `Drop`.
pub struct RunLock {
    pool: DbPool,
    task_id: String,
}

impl RunLock {
    pub async fn acquire(pool: &DbPool, task_id: &str, run_id: &str) -> Result<Self> {
        let mut conn = pool.get().await.map_err(|e| Error::Pool(e.to_string()))?;
        let new_lock = NewLock {
            task_id,
            run_id,
            started_at: chrono::Utc::now().naive_utc(),
        };

        let result = diesel::insert_into(scheduled_run_locks::table)
            .values(&new_lock)
            .execute(&mut conn)
            .await;

        match result {
            Ok(_) => Ok(Self {
                pool: pool.clone(),
                task_id: task_id.to_string(),
            }),
            Err(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            )) => Err(Error::InvalidConfig(format!(
                "task {task_id} already has a run in progress"
            ))),
            Err(e) => Err(Error::Database(e)),
        }
    }

    pub async fn release(self) -> Result<()> {
        let mut conn = self.pool.get().await.map_err(|e| Error::Pool(e.to_string()))?;
        diesel::delete(
            scheduled_run_locks::table.filter(scheduled_run_locks::task_id.eq(&self.task_id)),
        )
        .execute(&mut conn)
        .await?;
        Ok(())
    }
}
