//! # tally-engine: Units of Work for Tally
//!
//! Turns requests into atomic ledger changes on top of tally-db.
//!
//! ## Module Organization
//! ```text
//! tally_engine/
//! ├── lib.rs       ◄─── You are here (exports, tracing setup)
//! ├── engine.rs    ◄─── TransactionEngine: sales, refunds, deletion, registry
//! ├── costing.rs   ◄─── FifoCostingEngine: lot consumption, receipts, returns
//! ├── loyalty.rs   ◄─── LoyaltyLedger: awards, redemptions, reversals
//! ├── error.rs     ◄─── EngineError (Core | Db | Config)
//! └── api.rs       ◄─── ApiError: what the route layer serializes
//! ```
//!
//! ## Example
//! ```rust,no_run
//! use tally_core::config::EngineConfig;
//! use tally_core::{SaleLine, SaleRequest};
//! use tally_db::{Database, DbConfig};
//! use tally_engine::TransactionEngine;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(DbConfig::new("./tally.db")).await?;
//! let engine = TransactionEngine::new(db, EngineConfig::from_env()?);
//!
//! let sale = engine
//!     .create_sale(
//!         SaleRequest {
//!             items: vec![SaleLine {
//!                 product_id: "p-1".to_string(),
//!                 quantity: 2,
//!                 unit_price_cents: 450,
//!             }],
//!             customer_id: None,
//!             discount_cents: 0,
//!             loyalty_redemption: None,
//!             invoice_number: None,
//!         },
//!         "cashier-7",
//!     )
//!     .await?;
//! println!("{} charged {}", sale.invoice_number, sale.total());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod costing;
pub mod engine;
pub mod error;
pub mod loyalty;

use tracing_subscriber::EnvFilter;

pub use api::{ApiError, ErrorCode};
pub use costing::{FifoCostingEngine, Movement};
pub use engine::TransactionEngine;
pub use error::{EngineError, EngineResult};
pub use loyalty::{LoyaltyLedger, PointsEntry};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tally=debug,sqlx=warn";

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=tally=trace` - Show trace for tally crates only
/// - Default: [`DEFAULT_LOG_FILTER`]
///
/// Later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}
