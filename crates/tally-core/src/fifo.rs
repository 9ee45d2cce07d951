//! # FIFO Cost Planning
//!
//! Decides which units a sale consumes and what they cost. The database layer
//! loads the inputs and persists the plan; nothing here touches storage.
//!
//! ## Consumption Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  on hand: 10        tracked lots: L1 (4 @ $8, oldest)  L2 (2 @ $8)      │
//! │                                                                         │
//! │  legacy = max(0, 10 - (4 + 2)) = 4 units                               │
//! │  legacy unit cost = lot-weighted average = (4·8 + 2·8) / 6 = $8        │
//! │                                                                         │
//! │  sell 8:                                                                │
//! │    1. legacy  4 @ $8   (no lot decrement)                              │
//! │    2. L1      4 @ $8   (L1 remaining 4 → 0)                            │
//! │    3. L2      -        (not reached)                                   │
//! │                                                                         │
//! │  total $64, weighted average $8                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Legacy stock predates lot tracking, so its real cost is unknowable. It
//! borrows the cost profile of the stock currently on the shelf, falling back
//! to the product's own cost when there are no lots at all.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{div_round, Money};
use crate::types::Product;

// =============================================================================
// Inputs
// =============================================================================

/// The product-side inputs of a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockPosition {
    pub product_id: String,
    pub sku: String,
    pub on_hand: i64,
    pub fallback_cost: Money,
}

impl StockPosition {
    pub fn new(
        product_id: impl Into<String>,
        sku: impl Into<String>,
        on_hand: i64,
        fallback_cost: Money,
    ) -> Self {
        StockPosition {
            product_id: product_id.into(),
            sku: sku.into(),
            on_hand,
            fallback_cost,
        }
    }
}

impl From<&Product> for StockPosition {
    fn from(product: &Product) -> Self {
        StockPosition::new(&product.id, &product.sku, product.quantity, product.cost())
    }
}

/// A purchase lot with units left, as loaded from the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenLot {
    pub lot_id: String,
    pub remaining: i64,
    pub unit_cost: Money,
}

impl OpenLot {
    pub fn new(lot_id: impl Into<String>, remaining: i64, unit_cost: Money) -> Self {
        OpenLot {
            lot_id: lot_id.into(),
            remaining,
            unit_cost,
        }
    }
}

// =============================================================================
// Plan
// =============================================================================

/// Where a slice of units came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "lotId", rename_all = "snake_case")]
pub enum CostSource {
    /// Untracked stock priced at the borrowed average.
    Legacy,
    /// A tracked purchase lot.
    Lot(String),
}

/// Units taken from one source at one cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostSlice {
    pub source: CostSource,
    pub quantity: i64,
    /// Per-unit cost recorded on the ledger entry (rounded to the cent).
    pub unit_cost: Money,
    /// Exact cost of the slice.
    pub cost: Money,
}

/// Result of a FIFO walk.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CostPlan {
    pub quantity: i64,
    pub slices: Vec<CostSlice>,
    pub total_cost: Money,
}

impl CostPlan {
    /// Weighted average unit cost as a fraction of cents, for reporting.
    pub fn weighted_average_cents(&self) -> f64 {
        if self.quantity == 0 {
            return 0.0;
        }
        self.total_cost.cents() as f64 / self.quantity as f64
    }

    /// Weighted average unit cost rounded to the cent.
    pub fn unit_cost(&self) -> Money {
        self.total_cost.per_unit(self.quantity)
    }

    /// Units taken from untracked stock.
    pub fn legacy_units(&self) -> i64 {
        self.slices
            .iter()
            .filter(|s| s.source == CostSource::Legacy)
            .map(|s| s.quantity)
            .sum()
    }
}

// =============================================================================
// Planning
// =============================================================================

/// On-hand units not backed by any open lot.
pub fn legacy_quantity(on_hand: i64, lots: &[OpenLot]) -> i64 {
    let tracked: i64 = lots.iter().map(|l| l.remaining.max(0)).sum();
    (on_hand - tracked).max(0)
}

/// Cost of `units` legacy units.
///
/// Prices by the remaining-quantity weighted average of the open lots, or by
/// `fallback` when there are none. Returns (per-unit, exact total).
pub fn legacy_cost(units: i64, lots: &[OpenLot], fallback: Money) -> (Money, Money) {
    let (weighted, weight) = lots
        .iter()
        .filter(|l| l.remaining > 0)
        .fold((0i128, 0i128), |(sum, qty), lot| {
            (
                sum + lot.remaining as i128 * lot.unit_cost.cents() as i128,
                qty + lot.remaining as i128,
            )
        });

    if weight == 0 {
        return (fallback, fallback.multiply_quantity(units));
    }

    let per_unit = Money::from_cents(div_round(weighted, weight) as i64);
    let total = Money::from_cents(div_round(weighted * units as i128, weight) as i64);
    (per_unit, total)
}

/// Plans the consumption of `requested` units.
///
/// `lots` must be ordered oldest first. Legacy stock is consumed before any
/// lot. A zero request yields an empty plan.
///
/// ## Errors
/// - `InsufficientInventory` when `requested` exceeds on-hand stock
/// - `LedgerInconsistency` when lots plus legacy cannot cover a request that
///   on-hand stock allows
pub fn plan_consumption(
    position: &StockPosition,
    lots: &[OpenLot],
    requested: i64,
) -> CoreResult<CostPlan> {
    if requested < 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }
        .into());
    }
    if requested == 0 {
        return Ok(CostPlan::default());
    }

    if requested > position.on_hand {
        return Err(CoreError::InsufficientInventory {
            sku: position.sku.clone(),
            available: position.on_hand.max(0),
            requested,
        });
    }

    let open: Vec<&OpenLot> = lots.iter().filter(|l| l.remaining > 0).collect();
    let legacy_available = legacy_quantity(position.on_hand, lots);
    let tracked: i64 = open.iter().map(|l| l.remaining).sum();

    if legacy_available + tracked < requested {
        return Err(CoreError::ledger(
            &position.product_id,
            format!(
                "lots ({}) and legacy stock ({}) cover less than the {} requested units",
                tracked, legacy_available, requested
            ),
        ));
    }

    let mut plan = CostPlan {
        quantity: requested,
        ..CostPlan::default()
    };
    let mut outstanding = requested;

    let from_legacy = outstanding.min(legacy_available);
    if from_legacy > 0 {
        let (unit_cost, cost) = legacy_cost(from_legacy, lots, position.fallback_cost);
        plan.slices.push(CostSlice {
            source: CostSource::Legacy,
            quantity: from_legacy,
            unit_cost,
            cost,
        });
        plan.total_cost += cost;
        outstanding -= from_legacy;
    }

    for lot in open {
        if outstanding == 0 {
            break;
        }
        let take = outstanding.min(lot.remaining);
        let cost = lot.unit_cost.multiply_quantity(take);
        plan.slices.push(CostSlice {
            source: CostSource::Lot(lot.lot_id.clone()),
            quantity: take,
            unit_cost: lot.unit_cost,
            cost,
        });
        plan.total_cost += cost;
        outstanding -= take;
    }

    debug_assert_eq!(outstanding, 0);
    Ok(plan)
}

// =============================================================================
// Unit Tests
// =============================================================================
