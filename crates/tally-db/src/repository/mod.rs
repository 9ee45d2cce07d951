//! # Repository Module
//!
//! Database repository implementations for Tally.
//!
//! ## Two Ways In
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Readers (reports, lookups)          Engines (sale, refund, delete)     │
//! │       │                                   │                             │
//! │       │  db.products().get_by_id(id)      │  product::get(conn, id)     │
//! │       ▼                                   ▼                             │
//! │  ProductRepository (owns pool)       free functions on the unit of      │
//! │  acquires a connection per call      work's connection                  │
//! │       │                                   │                             │
//! │       └──────────────┬────────────────────┘                             │
//! │                      ▼                                                  │
//! │              same SQL, one place                                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Writes are only exposed as connection functions: nothing mutates stock or
//! balances outside a unit of work.
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Product registry
//! - [`LedgerRepository`](ledger::LedgerRepository) - Inventory records and lots
//! - [`CustomerRepository`](customer::CustomerRepository) - Customers and balances
//! - [`LoyaltyRepository`](loyalty::LoyaltyRepository) - Loyalty events
//! - [`TransactionRepository`](transaction::TransactionRepository) - Sales and lines

pub mod customer;
pub mod ledger;
pub mod loyalty;
pub mod product;
pub mod transaction;

/// Timestamp ordering for history reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Oldest first.
    #[default]
    Ascending,
    /// Newest first.
    Descending,
}

impl SortOrder {
    pub(crate) fn sql(self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}
