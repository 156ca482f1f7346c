//! Schema setup. Embeds the SQLite migrations at compile time and applies pending
//! ones via a blocking task, since `diesel_migrations`' harness needs a sync
//! connection and this crate otherwise only holds async pools.

use diesel::Connection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::info;

use crate::error::{Error, Result};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/sqlite");

/// Run any pending migrations against `database_url`. Idempotent: a database already
/// at the latest schema version applies nothing.
pub async fn run_pending(database_url: &str) -> Result<()> {
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url)
        .to_string();

    tokio::task::spawn_blocking(move || {
        let mut conn = diesel::SqliteConnection::establish(&path)
            .map_err(|e| Error::Pool(format!("cannot open {path} for migrations: {e}")))?;

        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| Error::Pool(format!("migration failed: {e}")))?;

        for migration in &applied {
            info!(%migration, "applied migration");
        }
        if applied.is_empty() {
            info!("no pending migrations");
        }

        Ok(())
    })
    .await
    .map_err(|e| Error::Pool(format!("migration task panicked: {e}")))?
}
