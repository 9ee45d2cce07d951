//! # Unit of Work
//!
//! One pooled connection inside `BEGIN IMMEDIATE ... COMMIT`.
//!
//! ## Why IMMEDIATE
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Two tills sell the last unit at the same moment                        │
//! │                                                                         │
//! │  Till A: BEGIN IMMEDIATE ──► write lock held                           │
//! │  Till B: BEGIN IMMEDIATE ──► waits (busy_timeout)                      │
//! │  Till A: quantity = 1, sell 1, quantity → 0, COMMIT                    │
//! │  Till B: lock acquired, quantity = 0 → InsufficientInventory           │
//! │                                                                         │
//! │  A deferred BEGIN would let both read quantity = 1 before either       │
//! │  writes; the later writer then fails to upgrade its lock mid-sale.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stock read inside a unit of work is therefore authoritative until commit.

use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};

/// Backoff step between busy retries; attempt `n` waits `n × BUSY_BACKOFF`.
const BUSY_BACKOFF: Duration = Duration::from_millis(50);

/// An open write transaction.
///
/// Finish with [`UnitOfWork::commit`] or [`UnitOfWork::rollback`]. A unit of
/// work dropped without either closes its connection, which makes SQLite
/// discard the transaction.
#[derive(Debug)]
pub struct UnitOfWork {
    conn: Option<PoolConnection<Sqlite>>,
}

impl UnitOfWork {
    pub(crate) async fn begin(pool: &SqlitePool, busy_retries: u32) -> DbResult<Self> {
        let mut attempt = 0;
        loop {
            match Self::try_begin(pool).await {
                Ok(uow) => return Ok(uow),
                Err(err) if err.is_busy() && attempt < busy_retries => {
                    attempt += 1;
                    warn!(attempt, "Write lock busy, retrying");
                    tokio::time::sleep(BUSY_BACKOFF * attempt).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn try_begin(pool: &SqlitePool) -> DbResult<Self> {
        let mut conn = pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut *conn)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::Busy => DbError::Busy,
                other => DbError::TransactionFailed(other.to_string()),
            })?;

        debug!("Unit of work started");
        Ok(UnitOfWork { conn: Some(conn) })
    }

    /// The connection every statement of this unit of work must run on.
    pub fn conn(&mut self) -> DbResult<&mut SqliteConnection> {
        self.conn
            .as_deref_mut()
            .ok_or_else(|| DbError::TransactionFailed("unit of work already finished".to_string()))
    }

    pub async fn commit(mut self) -> DbResult<()> {
        let mut conn = self.take()?;
        if let Err(e) = sqlx::query("COMMIT").execute(&mut *conn).await {
            warn!(error = %e, "Commit failed, closing connection");
            drop(conn.detach());
            return Err(DbError::TransactionFailed(e.to_string()));
        }
        debug!("Unit of work committed");
        Ok(())
    }

    /// Discards every write. Failures are logged; the connection is closed
    /// instead of being returned with an open transaction.
    pub async fn rollback(mut self) {
        let Ok(mut conn) = self.take() else {
            return;
        };
        match sqlx::query("ROLLBACK").execute(&mut *conn).await {
            Ok(_) => debug!("Unit of work rolled back"),
            Err(e) => {
                warn!(error = %e, "Rollback failed, closing connection");
                drop(conn.detach());
            }
        }
    }

    fn take(&mut self) -> DbResult<PoolConnection<Sqlite>> {
        self.conn
            .take()
            .ok_or_else(|| DbError::TransactionFailed("unit of work already finished".to_string()))
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            warn!("Unit of work dropped without commit, discarding");
            drop(conn.detach());
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
