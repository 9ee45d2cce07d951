//! # Domain Types
//!
//! Entities shared by the engines, the database layer and the route layer.
//!
//! ## Entity Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────┐   ┌─────────────────┐      │
//! │  │    Product      │◄──│ InventoryRecord  │   │    Customer     │      │
//! │  │  ─────────────  │   │  ──────────────  │   │  ─────────────  │      │
//! │  │  sku (unique)   │   │  purchase (lot)  │   │  loyalty_points │      │
//! │  │  quantity       │   │  sale / return   │   │  total_spent    │      │
//! │  │  cost_cents     │   │  remaining_qty   │   └────────▲────────┘      │
//! │  └────────▲────────┘   └──────────────────┘            │               │
//! │           │                                   ┌────────┴────────┐      │
//! │  ┌────────┴────────┐                          │  LoyaltyEvent   │      │
//! │  │ TransactionItem │◄── Transaction ─────────►│  earn / redeem  │      │
//! │  └─────────────────┘    (invoice, totals,     │  refund_reversal│      │
//! │                          refund fields)       └─────────────────┘      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Mutability
//! - `Product` and `Customer` are long-lived and updated in place.
//! - `InventoryRecord` and `LoyaltyEvent` are append-only; a purchase lot's
//!   `remaining_quantity` is the only field that ever changes.
//! - `Transaction` is written once; afterwards only its refund fields move.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// One record per SKU; the authoritative on-hand quantity.
///
/// `quantity` equals the remaining units of all open purchase lots plus any
/// legacy stock that predates lot tracking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,

    /// Stock Keeping Unit - business identifier, unique.
    pub sku: String,

    pub name: String,

    /// Units on hand. Never negative.
    pub quantity: i64,

    /// Fallback unit cost when no tracked lot exists.
    pub cost_cents: i64,

    /// Restock threshold used by low-stock readers.
    pub reorder_level: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_cents(self.cost_cents)
    }

    /// Checks whether `quantity` units can leave the shelf.
    #[inline]
    pub fn can_sell(&self, quantity: i64) -> bool {
        quantity <= self.quantity
    }

    /// True when on-hand stock has dropped to the reorder threshold.
    #[inline]
    pub fn needs_reorder(&self) -> bool {
        self.quantity <= self.reorder_level
    }
}

// =============================================================================
// Inventory Ledger
// =============================================================================

/// Kind of inventory movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    /// A lot: units acquired at a known cost.
    Purchase,
    /// Units leaving stock through a sale.
    Sale,
    /// Units coming back through a refund or a deleted sale.
    Return,
}

/// What caused a ledger or loyalty entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    /// Goods receipt / purchase order.
    PurchaseOrder,
    /// A sale transaction (creation or refund).
    Transaction,
    /// Compensation emitted while deleting a sale transaction.
    TransactionDeletion,
    /// A points redemption made outside of a sale.
    StandaloneRedemption,
    /// Manual correction.
    Adjustment,
}

/// One inventory movement.
///
/// For `Purchase` records `remaining_quantity` counts units not yet sold
/// (`0 <= remaining_quantity <= quantity`). For `Sale` records
/// `source_lot_id` names the consumed lot, or is `None` with `legacy = true`
/// when the units came from untracked stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRecord {
    pub id: String,
    pub product_id: String,
    pub record_type: RecordType,
    pub quantity: i64,
    pub remaining_quantity: i64,
    pub unit_cost_cents: i64,
    pub source_lot_id: Option<String>,
    pub legacy: bool,
    pub reference_type: ReferenceType,
    pub reference_id: String,
    pub performed_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl InventoryRecord {
    #[inline]
    pub fn unit_cost(&self) -> Money {
        Money::from_cents(self.unit_cost_cents)
    }

    /// A purchase lot that still has units to give.
    #[inline]
    pub fn is_open_lot(&self) -> bool {
        self.record_type == RecordType::Purchase && self.remaining_quantity > 0
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A sale, possibly refunded.
///
/// `total_cents = subtotal_cents - discount_cents - loyalty_discount_cents`.
/// `refunded` goes from false to true at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub invoice_number: String,

    /// Loaded separately from `transaction_items`.
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<TransactionItem>,

    pub customer_id: Option<String>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub loyalty_discount_cents: i64,
    pub loyalty_points_awarded: i64,
    pub loyalty_points_redeemed: i64,

    /// Standalone redemption folded into this sale, if any.
    pub redemption_event_id: Option<String>,

    pub total_cents: i64,
    pub refunded: bool,
    pub refund_amount_cents: i64,
    pub refund_reason: Option<String>,
    #[ts(as = "Option<String>")]
    pub refunded_at: Option<DateTime<Utc>>,
    pub performed_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Finds the line selling `product_id`.
    pub fn line_for(&self, product_id: &str) -> Option<&TransactionItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// Sum of per-line FIFO cost; the margin basis for reporting.
    pub fn cost_of_goods(&self) -> Money {
        self.items.iter().map(|i| Money::from_cents(i.cost_cents)).sum()
    }
}

/// A line of a sale.
///
/// `unit_price_cents` is what the customer paid; `unit_cost_cents` /
/// `cost_cents` are what the FIFO walk says the units cost us.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TransactionItem {
    pub id: String,
    pub transaction_id: String,
    pub product_id: String,
    /// SKU at time of sale (frozen).
    pub sku_snapshot: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// unit_price × quantity.
    pub subtotal_cents: i64,
    /// Weighted average FIFO cost, rounded to the cent.
    pub unit_cost_cents: i64,
    /// Exact FIFO cost of the whole line.
    pub cost_cents: i64,
    pub refunded_quantity: i64,
}

impl TransactionItem {
    /// Units that can still be returned.
    #[inline]
    pub fn refundable(&self) -> i64 {
        self.quantity - self.refunded_quantity
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

// =============================================================================
// Customer & Loyalty
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    /// Current point balance. Never negative.
    pub loyalty_points: i64,
    pub total_spent_cents: i64,
    pub purchase_count: i64,
    #[ts(as = "Option<String>")]
    pub last_purchase: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Customer {
    #[inline]
    pub fn total_spent(&self) -> Money {
        Money::from_cents(self.total_spent_cents)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LoyaltyEventType {
    Earn,
    Redeem,
    /// Undoes an earlier earn or redeem when a sale is refunded or deleted.
    RefundReversal,
}

/// Immutable record of a balance change.
///
/// `points` is the requested delta even when the stored balance was clamped
/// at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyEvent {
    pub id: String,
    pub customer_id: String,
    pub points: i64,
    pub event_type: LoyaltyEventType,
    pub reason: String,
    pub reference_type: ReferenceType,
    pub reference_id: String,
    pub monetary_value_cents: i64,
    pub performed_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(quantity: i64, reorder_level: i64) -> Product {
        let now = Utc::now();
        Product {
            id: "p-1".to_string(),
            sku: "COKE-330".to_string(),
            name: "Coca-Cola 330ml".to_string(),
            quantity,
            cost_cents: 50,
            reorder_level,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_product_stock_checks() {
        let p = product(3, 5);
        assert!(p.can_sell(3));
        assert!(!p.can_sell(4));
        assert!(p.needs_reorder());
        assert!(!product(10, 5).needs_reorder());
    }

    #[test]
    fn test_item_refundable() {
        let item = TransactionItem {
            id: "i-1".to_string(),
            transaction_id: "t-1".to_string(),
            product_id: "p-1".to_string(),
            sku_snapshot: "COKE-330".to_string(),
            quantity: 5,
            unit_price_cents: 199,
            subtotal_cents: 995,
            unit_cost_cents: 50,
            cost_cents: 250,
            refunded_quantity: 2,
        };
        assert_eq!(item.refundable(), 3);
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(
            serde_json::to_string(&LoyaltyEventType::RefundReversal).unwrap(),
            "\"refund_reversal\""
        );
        assert_eq!(serde_json::to_string(&RecordType::Purchase).unwrap(), "\"purchase\"");
    }
}
