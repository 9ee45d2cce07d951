//! # Database Handle
//!
//! Opens the till's SQLite file and hands out repositories and units of work.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Database (cloneable)                           │
//! │                                                                         │
//! │   SqlitePool (WAL, foreign_keys, busy_timeout)                          │
//! │       │                                                                 │
//! │       ├── db.products() / db.ledger() / ...   readers, run concurrently │
//! │       │                                                                 │
//! │       └── db.begin(retries) → UnitOfWork      one writer at a time      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! WAL lets readers keep answering stock lookups while a sale holds the
//! write lock.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::customer::CustomerRepository;
use crate::repository::ledger::LedgerRepository;
use crate::repository::loyalty::LoyaltyRepository;
use crate::repository::product::ProductRepository;
use crate::repository::transaction::TransactionRepository;
use crate::unit_of_work::UnitOfWork;

/// Where the ledger lives and how the pool behaves.
///
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/tally/till-1.db")
///     .max_connections(4)
///     .busy_timeout(Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, created on first open.
    pub path: PathBuf,

    /// Pool size. Default: 5
    pub max_connections: u32,

    /// How long a caller waits for a free pooled connection. Default: 30 s
    pub acquire_timeout: Duration,

    /// How long SQLite itself waits on another writer before returning
    /// `SQLITE_BUSY`. Default: 5 s
    pub busy_timeout: Duration,

    in_memory: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            path: path.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            in_memory: false,
        }
    }

    /// A private in-memory ledger on a single connection.
    ///
    /// Every `:memory:` connection is its own database, so the pool is pinned
    /// to one connection that never expires. A reader awaited while a unit of
    /// work is open on the same task will therefore wait for the pool.
    pub fn in_memory() -> Self {
        DbConfig {
            path: PathBuf::from(":memory:"),
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(5),
            in_memory: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.in_memory
    }

    fn connect_options(&self) -> SqliteConnectOptions {
        let options = if self.in_memory {
            SqliteConnectOptions::new().in_memory(true)
        } else {
            SqliteConnectOptions::new()
                .filename(&self.path)
                .create_if_missing(true)
        };

        options
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout)
    }
}

/// Handle to the ledger store. Clones share one pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and brings the schema up to date.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(1)
            .acquire_timeout(config.acquire_timeout);

        if config.in_memory {
            // Losing the only connection loses the database
            pool_options = pool_options.max_lifetime(None).idle_timeout(None);
        }

        let pool = pool_options
            .connect_with(config.connect_options())
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            path = %config.path.display(),
            max_connections = config.max_connections,
            "Ledger database opened"
        );

        migrations::run_migrations(&pool).await?;
        Ok(Database { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Opens a unit of work holding the write lock.
    ///
    /// Retries up to `busy_retries` times when the lock stays busy past the
    /// connection's busy timeout.
    pub async fn begin(&self, busy_retries: u32) -> DbResult<UnitOfWork> {
        UnitOfWork::begin(&self.pool, busy_retries).await
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn ledger(&self) -> LedgerRepository {
        LedgerRepository::new(self.pool.clone())
    }

    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.pool.clone())
    }

    pub fn loyalty(&self) -> LoyaltyRepository {
        LoyaltyRepository::new(self.pool.clone())
    }

    pub fn transactions(&self) -> TransactionRepository {
        TransactionRepository::new(self.pool.clone())
    }
}
