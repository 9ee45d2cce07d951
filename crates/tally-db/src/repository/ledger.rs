//! # Ledger Repository
//!
//! The append-only inventory ledger: purchase lots, sale entries, returns.
//!
//! ## Lot Order
//! Open lots are read oldest first by `created_at`, ties broken by insertion
//! order (`rowid`), which is the order the FIFO planner consumes them in.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use super::SortOrder;
use crate::error::DbResult;
use tally_core::{InventoryRecord, ReferenceType};

const RECORD_COLUMNS: &str = "id, product_id, record_type, quantity, remaining_quantity, \
     unit_cost_cents, source_lot_id, legacy, reference_type, reference_id, performed_by, created_at";

// =============================================================================
// Unit-of-work functions
// =============================================================================

pub async fn insert(conn: &mut SqliteConnection, record: &InventoryRecord) -> DbResult<()> {
    debug!(
        product_id = %record.product_id,
        record_type = ?record.record_type,
        quantity = record.quantity,
        "Appending ledger record"
    );

    sqlx::query(
        r#"
        INSERT INTO inventory_records (
            id, product_id, record_type, quantity, remaining_quantity,
            unit_cost_cents, source_lot_id, legacy, reference_type, reference_id,
            performed_by, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&record.id)
    .bind(&record.product_id)
    .bind(record.record_type)
    .bind(record.quantity)
    .bind(record.remaining_quantity)
    .bind(record.unit_cost_cents)
    .bind(&record.source_lot_id)
    .bind(record.legacy)
    .bind(record.reference_type)
    .bind(&record.reference_id)
    .bind(&record.performed_by)
    .bind(record.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Purchase lots of a product with units left, oldest first.
pub async fn open_lots(
    conn: &mut SqliteConnection,
    product_id: &str,
) -> DbResult<Vec<InventoryRecord>> {
    let lots = sqlx::query_as::<_, InventoryRecord>(&format!(
        "SELECT {RECORD_COLUMNS} FROM inventory_records
         WHERE product_id = ?1 AND record_type = 'purchase' AND remaining_quantity > 0
         ORDER BY created_at ASC, rowid ASC"
    ))
    .bind(product_id)
    .fetch_all(conn)
    .await?;

    Ok(lots)
}

/// Takes `quantity` units from a lot.
///
/// Returns `false` when the lot does not have that many units left.
pub async fn decrement_lot(
    conn: &mut SqliteConnection,
    lot_id: &str,
    quantity: i64,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE inventory_records
        SET remaining_quantity = remaining_quantity - ?2
        WHERE id = ?1 AND record_type = 'purchase' AND remaining_quantity >= ?2
        "#,
    )
    .bind(lot_id)
    .bind(quantity)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Every record caused by one business event, in insertion order.
pub async fn by_reference(
    conn: &mut SqliteConnection,
    reference_type: ReferenceType,
    reference_id: &str,
) -> DbResult<Vec<InventoryRecord>> {
    let records = sqlx::query_as::<_, InventoryRecord>(&format!(
        "SELECT {RECORD_COLUMNS} FROM inventory_records
         WHERE reference_type = ?1 AND reference_id = ?2
         ORDER BY rowid ASC"
    ))
    .bind(reference_type)
    .bind(reference_id)
    .fetch_all(conn)
    .await?;

    Ok(records)
}

// =============================================================================
// Reader
// =============================================================================

#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// A product's movements ordered by time.
    pub async fn history(
        &self,
        product_id: &str,
        order: SortOrder,
        limit: u32,
    ) -> DbResult<Vec<InventoryRecord>> {
        let direction = order.sql();
        let records = sqlx::query_as::<_, InventoryRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM inventory_records
             WHERE product_id = ?1
             ORDER BY created_at {direction}, rowid {direction}
             LIMIT ?2"
        ))
        .bind(product_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn open_lots(&self, product_id: &str) -> DbResult<Vec<InventoryRecord>> {
        let mut conn = self.pool.acquire().await?;
        open_lots(&mut conn, product_id).await
    }

    pub async fn by_reference(
        &self,
        reference_type: ReferenceType,
        reference_id: &str,
    ) -> DbResult<Vec<InventoryRecord>> {
        let mut conn = self.pool.acquire().await?;
        by_reference(&mut conn, reference_type, reference_id).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
