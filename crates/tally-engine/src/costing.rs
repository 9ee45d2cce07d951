//! # FIFO Costing Engine
//!
//! Applies a [`CostPlan`] to the ledger inside a unit of work.
//!
//! ## Sale Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  consume(product, 7)                                                    │
//! │       │                                                                 │
//! │       ├── load open lots (oldest first)                                │
//! │       ├── plan_consumption()          ← tally-core, pure               │
//! │       │                                                                 │
//! │       ├── legacy slice  → sale record (legacy, no lot)                 │
//! │       ├── lot slice L1  → L1.remaining -= 5, sale record → L1          │
//! │       ├── lot slice L2  → L2.remaining -= 2, sale record → L2          │
//! │       │                                                                 │
//! │       └── product.quantity -= 7      (guarded)                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Returned and received units never merge back into an existing lot:
//! receipts append a new lot, returns append a `return` record.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, error};
use uuid::Uuid;

use crate::error::EngineResult;
use tally_core::fifo::{plan_consumption, CostPlan, CostSource, OpenLot, StockPosition};
use tally_core::{CoreError, InventoryRecord, Money, Product, RecordType, ReferenceType};
use tally_db::repository::{ledger, product};

/// What caused a stock movement, stamped on every ledger record it writes.
#[derive(Debug, Clone, Copy)]
pub struct Movement<'a> {
    pub reference_type: ReferenceType,
    pub reference_id: &'a str,
    pub performed_by: &'a str,
    pub at: DateTime<Utc>,
}

impl<'a> Movement<'a> {
    pub fn new(reference_type: ReferenceType, reference_id: &'a str, performed_by: &'a str) -> Self {
        Movement {
            reference_type,
            reference_id,
            performed_by,
            at: Utc::now(),
        }
    }

    fn record(&self, product_id: &str, record_type: RecordType, quantity: i64) -> InventoryRecord {
        InventoryRecord {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            record_type,
            quantity,
            remaining_quantity: 0,
            unit_cost_cents: 0,
            source_lot_id: None,
            legacy: false,
            reference_type: self.reference_type,
            reference_id: self.reference_id.to_string(),
            performed_by: self.performed_by.to_string(),
            created_at: self.at,
        }
    }
}

/// Stateless; every call runs on the caller's unit of work.
#[derive(Debug, Clone, Copy, Default)]
pub struct FifoCostingEngine;

impl FifoCostingEngine {
    pub fn new() -> Self {
        FifoCostingEngine
    }

    /// Sells `quantity` units of `product`, oldest stock first.
    ///
    /// `product` must have been read on `conn` inside the current unit of
    /// work. A zero quantity writes nothing and costs nothing.
    pub async fn consume(
        &self,
        conn: &mut SqliteConnection,
        product: &Product,
        quantity: i64,
        movement: Movement<'_>,
    ) -> EngineResult<CostPlan> {
        let lots: Vec<OpenLot> = ledger::open_lots(&mut *conn, &product.id)
            .await?
            .into_iter()
            .map(|lot| {
                let cost = lot.unit_cost();
                OpenLot::new(lot.id, lot.remaining_quantity, cost)
            })
            .collect();

        let plan = plan_consumption(&StockPosition::from(product), &lots, quantity)
            .inspect_err(|err| {
                if let CoreError::LedgerInconsistency { .. } = err {
                    error!(product_id = %product.id, error = %err, "FIFO coverage short");
                }
            })?;

        if plan.quantity == 0 {
            return Ok(plan);
        }

        for slice in &plan.slices {
            let mut record = movement.record(&product.id, RecordType::Sale, slice.quantity);
            record.unit_cost_cents = slice.unit_cost.cents();

            match &slice.source {
                CostSource::Legacy => record.legacy = true,
                CostSource::Lot(lot_id) => {
                    if !ledger::decrement_lot(&mut *conn, lot_id, slice.quantity).await? {
                        error!(product_id = %product.id, lot_id = %lot_id, "Lot decrement touched no row");
                        return Err(CoreError::ledger(
                            &product.id,
                            format!("lot {lot_id} has fewer than {} units left", slice.quantity),
                        )
                        .into());
                    }
                    record.source_lot_id = Some(lot_id.clone());
                }
            }

            ledger::insert(&mut *conn, &record).await?;
        }

        if !product::decrement_quantity(&mut *conn, &product.id, quantity, movement.at).await? {
            error!(product_id = %product.id, quantity, "Product decrement touched no row");
            return Err(CoreError::ledger(
                &product.id,
                format!("on-hand quantity dropped below {quantity} mid-sale"),
            )
            .into());
        }

        debug!(
            product_id = %product.id,
            quantity,
            total_cost = plan.total_cost.cents(),
            legacy_units = plan.legacy_units(),
            "Consumed stock"
        );
        Ok(plan)
    }

    /// Appends a purchase lot and puts its units on the shelf.
    pub async fn receive(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
        quantity: i64,
        unit_cost: Money,
        movement: Movement<'_>,
    ) -> EngineResult<InventoryRecord> {
        let mut lot = movement.record(product_id, RecordType::Purchase, quantity);
        lot.remaining_quantity = quantity;
        lot.unit_cost_cents = unit_cost.cents();

        ledger::insert(&mut *conn, &lot).await?;
        product::increment_quantity(&mut *conn, product_id, quantity, movement.at).await?;

        debug!(product_id = %product_id, lot_id = %lot.id, quantity, "Received lot");
        Ok(lot)
    }

    /// Appends a `return` record and puts the units back on the shelf.
    ///
    /// Returned units are not tracked by any lot, so later sales treat them
    /// as legacy stock.
    pub async fn return_units(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
        quantity: i64,
        unit_cost: Money,
        movement: Movement<'_>,
    ) -> EngineResult<InventoryRecord> {
        let mut record = movement.record(product_id, RecordType::Return, quantity);
        record.unit_cost_cents = unit_cost.cents();

        ledger::insert(&mut *conn, &record).await?;
        product::increment_quantity(&mut *conn, product_id, quantity, movement.at).await?;

        debug!(product_id = %product_id, quantity, "Returned units to stock");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_db::{Database, DbConfig};

    async fn setup(on_hand: i64, lots: &[(i64, i64)]) -> (Database, Product) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        let p = Product {
            id: "p-1".to_string(),
            sku: "BEANS".to_string(),
            name: "Beans".to_string(),
            quantity: on_hand,
            cost_cents: 900,
            reorder_level: 0,
            created_at: now,
            updated_at: now,
        };

        let engine = FifoCostingEngine::new();
        let mut uow = db.begin(0).await.unwrap();
        product::insert(uow.conn().unwrap(), &p).await.unwrap();
        for (i, (qty, cost)) in lots.iter().enumerate() {
            let po = format!("po-{i}");
            let mut movement = Movement::new(ReferenceType::PurchaseOrder, &po, "tester");
            movement.at = now + chrono::Duration::seconds(i as i64);
            engine
                .receive(uow.conn().unwrap(), "p-1", *qty, Money::from_cents(*cost), movement)
                .await
                .unwrap();
        }
        uow.commit().await.unwrap();

        let p = db.products().get_by_id("p-1").await.unwrap().unwrap();
        (db, p)
    }

    #[tokio::test]
    async fn test_consume_walks_lots_and_writes_records() {
        let (db, p) = setup(0, &[(5, 1000), (5, 1200)]).await;
        assert_eq!(p.quantity, 10);

        let mut uow = db.begin(0).await.unwrap();
        let movement = Movement::new(ReferenceType::Transaction, "t-1", "tester");
        let plan = FifoCostingEngine::new()
            .consume(uow.conn().unwrap(), &p, 7, movement)
            .await
            .unwrap();
        uow.commit().await.unwrap();

        assert_eq!(plan.total_cost.cents(), 7400);
        let lots = db.ledger().open_lots("p-1").await.unwrap();
        assert_eq!(lots.len(), 1);
        assert_eq!(lots[0].remaining_quantity, 3);

        let sales = db
            .ledger()
            .by_reference(ReferenceType::Transaction, "t-1")
            .await
            .unwrap();
        assert_eq!(sales.len(), 2);
        assert!(sales.iter().all(|r| r.record_type == RecordType::Sale));
        assert_eq!(sales.iter().map(|r| r.quantity).sum::<i64>(), 7);

        let after = db.products().get_by_id("p-1").await.unwrap().unwrap();
        assert_eq!(after.quantity, 3);
    }

    #[tokio::test]
    async fn test_legacy_units_leave_lots_alone() {
        // 4 legacy units on top of one lot of 6 @ $8
        let (db, p) = setup(4, &[(6, 800)]).await;

        let mut uow = db.begin(0).await.unwrap();
        let movement = Movement::new(ReferenceType::Transaction, "t-1", "tester");
        let plan = FifoCostingEngine::new()
            .consume(uow.conn().unwrap(), &p, 3, movement)
            .await
            .unwrap();
        uow.commit().await.unwrap();

        assert_eq!(plan.legacy_units(), 3);
        assert_eq!(plan.unit_cost().cents(), 800);
        let lots = db.ledger().open_lots("p-1").await.unwrap();
        assert_eq!(lots[0].remaining_quantity, 6);

        let sales = db
            .ledger()
            .by_reference(ReferenceType::Transaction, "t-1")
            .await
            .unwrap();
        assert!(sales[0].legacy);
        assert_eq!(sales[0].source_lot_id, None);
    }

    #[tokio::test]
    async fn test_insufficient_inventory_writes_nothing() {
        let (db, p) = setup(0, &[(2, 100)]).await;

        let mut uow = db.begin(0).await.unwrap();
        let movement = Movement::new(ReferenceType::Transaction, "t-1", "tester");
        let err = FifoCostingEngine::new()
            .consume(uow.conn().unwrap(), &p, 3, movement)
            .await
            .unwrap_err();
        uow.rollback().await;

        assert!(matches!(
            err.core(),
            Some(CoreError::InsufficientInventory {
                available: 2,
                requested: 3,
                ..
            })
        ));
        assert_eq!(db.products().get_by_id("p-1").await.unwrap().unwrap().quantity, 2);
    }

    #[tokio::test]
    async fn test_stale_product_is_a_ledger_inconsistency() {
        let (db, mut p) = setup(0, &[(2, 100)]).await;
        // pretend the caller read more stock than the lots hold
        p.quantity = 5;

        let mut uow = db.begin(0).await.unwrap();
        let movement = Movement::new(ReferenceType::Transaction, "t-1", "tester");
        let err = FifoCostingEngine::new()
            .consume(uow.conn().unwrap(), &p, 5, movement)
            .await
            .unwrap_err();
        uow.rollback().await;

        assert!(err.is_ledger_inconsistency());
    }
}
