//! # tally-core: Pure Business Logic for Tally
//!
//! This crate holds the accounting rules of the point-of-sale ledger core as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                Route layer (external collaborator)              │   │
//! │  │      create_sale, refund, delete_transaction, redeem points     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 tally-engine (units of work)                    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   fifo    │  │  loyalty  │  │   │
//! │  │   │  Product  │  │   Money   │  │ CostPlan  │  │  Policy   │  │   │
//! │  │   │Transaction│  │ ratios    │  │ legacy    │  │ Redemption│  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Database Layer)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entities (Product, InventoryRecord, Transaction, Customer, LoyaltyEvent)
//! - [`request`] - Sale/refund request payloads
//! - [`money`] - Money type with integer arithmetic
//! - [`fifo`] - FIFO cost planning with legacy backfill
//! - [`loyalty`] - Points rate policies and redemption rate
//! - [`config`] - Engine configuration
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::fifo::{plan_consumption, OpenLot, StockPosition};
//! use tally_core::Money;
//!
//! let position = StockPosition::new("p-1", "COFFEE-1KG", 10, Money::from_cents(900));
//! let lots = vec![
//!     OpenLot::new("lot-1", 5, Money::from_cents(1000)),
//!     OpenLot::new("lot-2", 5, Money::from_cents(1200)),
//! ];
//!
//! // All of lot-1, then 2 units of lot-2
//! let plan = plan_consumption(&position, &lots, 7).unwrap();
//! assert_eq!(plan.total_cost.cents(), 7400);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod fifo;
pub mod loyalty;
pub mod money;
pub mod request;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use request::*;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single sale.
pub const MAX_TRANSACTION_LINES: usize = 100;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// Catches keying mistakes (1000 instead of 10) before they drain a lot.
pub const MAX_LINE_QUANTITY: i64 = 9_999;

/// Highest unit price a line may carry, in cents.
///
/// ## Business Reason
/// Bounds line and sale totals well inside `i64` cents.
pub const MAX_UNIT_PRICE_CENTS: i64 = 100_000_000;

/// Most points a single redemption may spend.
pub const MAX_REDEMPTION_POINTS: i64 = 1_000_000_000;

/// Maximum length of a free-text refund reason.
pub const MAX_REASON_LENGTH: usize = 500;
