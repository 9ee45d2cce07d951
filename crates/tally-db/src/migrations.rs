//! Schema migrations for the ledger store.
//!
//! The SQL lives in `migrations/sqlite/` at the workspace root and is
//! compiled into the binary. sqlx keeps the applied set in
//! `_sqlx_migrations`, so reopening an existing till database only runs
//! files it has not seen.
//!
//! New schema changes go in a new `NNN_description.sql` file. An applied
//! file is never edited: sqlx checksums it and refuses to start on a
//! mismatch.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every embedded migration not yet recorded in the database.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let (embedded, applied) = match migration_status(pool).await {
        Ok(status) => status,
        // Fresh file: the bookkeeping table does not exist yet
        Err(_) => (MIGRATOR.migrations.len(), 0),
    };
    debug!(embedded, applied, "Migration status before run");

    MIGRATOR.run(pool).await?;

    if embedded > applied {
        info!(count = embedded - applied, "Applied ledger schema migrations");
    }
    Ok(())
}

/// Returns `(embedded, applied)` migration counts.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let applied: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await?;

    Ok((MIGRATOR.migrations.len(), applied as usize))
}
