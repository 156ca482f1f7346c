//! Global Settings record (spec.md §6): a single keyed row, upserted, fetched and
//! persisted through the same `diesel-async` pool as the Paper Store.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::config::GlobalSettings;
use crate::error::{Error, Result};
use crate::schema::global_settings;

use super::DbPool;

const ROW_ID: i32 = 1;

#[derive(Queryable, Selectable)]
#[diesel(table_name = global_settings)]
struct GlobalSettingsRow {
    data: String,
}

async fn conn(
    pool: &DbPool,
) -> Result<diesel_async::pooled_connection::deadpool::Object<super::DbConnection>> {
    pool.get().await.map_err(|e| Error::Pool(e.to_string()))
}

/// Returns `None` if no settings row has ever been saved.
pub async fn load(pool: &DbPool) -> Result<Option<GlobalSettings>> {
    let mut conn = conn(pool).await?;
    let row: Option<GlobalSettingsRow> = global_settings::table
        .filter(global_settings::id.eq(ROW_ID))
        .select(GlobalSettingsRow::as_select())
        .first(&mut conn)
        .await
        .optional()?;

    row.map(|r| serde_json::from_str(&r.data).map_err(Error::from))
        .transpose()
}

/// Upsert the single settings row: update if present, insert otherwise.
pub async fn save(pool: &DbPool, settings: &GlobalSettings) -> Result<()> {
    let mut conn = conn(pool).await?;
    let now = chrono::Utc::now().naive_utc();
    let data = serde_json::to_string(settings)?;

    let affected = diesel::update(global_settings::table.filter(global_settings::id.eq(ROW_ID)))
        .set((
            global_settings::data.eq(&data),
            global_settings::updated_at.eq(now),
        ))
        .execute(&mut conn)
        .await?;

    if affected == 0 {
        diesel::insert_into(global_settings::table)
            .values((
                global_settings::id.eq(ROW_ID),
                global_settings::data.eq(&data),
                global_settings::updated_at.eq(now),
            ))
            .execute(&mut conn)
            .await?;
    }

    Ok(())
}
