//! # tally-db: Database Layer for Tally
//!
//! SQLite persistence for the ledger core, via sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Data Flow                                  │
//! │                                                                         │
//! │  TransactionEngine::create_sale                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ product       │    │ 001_init.sql │  │   │
//! │  │   │ SqlitePool    │◄───│ ledger        │    │              │  │   │
//! │  │   │ UnitOfWork    │    │ customer      │    │              │  │   │
//! │  │   │               │    │ loyalty       │    │              │  │   │
//! │  │   │               │    │ transaction   │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`unit_of_work`] - `BEGIN IMMEDIATE` write transactions
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, DbConfig};
//! use tally_db::repository::product;
//!
//! let db = Database::new(DbConfig::new("tally.db")).await?;
//!
//! // Readers go through the pool
//! let low = db.products().needing_reorder().await?;
//!
//! // Writers go through a unit of work
//! let mut uow = db.begin(3).await?;
//! let ok = product::decrement_quantity(uow.conn()?, &id, 2, Utc::now()).await?;
//! uow.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod unit_of_work;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::SortOrder;
pub use unit_of_work::UnitOfWork;

pub use repository::customer::CustomerRepository;
pub use repository::ledger::LedgerRepository;
pub use repository::loyalty::LoyaltyRepository;
pub use repository::product::ProductRepository;
pub use repository::transaction::TransactionRepository;
