//! # Transaction Repository
//!
//! Sale transactions and their lines.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  insert()            header + lines, once, last step of a sale          │
//! │     │                                                                   │
//! │     ├── mark_refunded()       refunded 0 → 1, guarded, at most once    │
//! │     │   add_refunded_quantity() per line, never past the sold quantity │
//! │     │                                                                   │
//! │     └── delete()              only after compensating entries exist    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tally_core::{Transaction, TransactionItem};

const TRANSACTION_COLUMNS: &str = "id, invoice_number, customer_id, subtotal_cents, \
     discount_cents, loyalty_discount_cents, loyalty_points_awarded, loyalty_points_redeemed, \
     redemption_event_id, total_cents, refunded, refund_amount_cents, refund_reason, \
     refunded_at, performed_by, created_at";

const ITEM_COLUMNS: &str = "id, transaction_id, product_id, sku_snapshot, quantity, \
     unit_price_cents, subtotal_cents, unit_cost_cents, cost_cents, refunded_quantity";

// =============================================================================
// Unit-of-work functions
// =============================================================================

/// Inserts the transaction and all of its lines.
///
/// ## Returns
/// * `Err(DbError::UniqueViolation)` on `transactions.invoice_number` or
///   `transactions.redemption_event_id`
pub async fn insert(conn: &mut SqliteConnection, transaction: &Transaction) -> DbResult<()> {
    debug!(
        id = %transaction.id,
        invoice_number = %transaction.invoice_number,
        lines = transaction.items.len(),
        "Inserting transaction"
    );

    sqlx::query(
        r#"
        INSERT INTO transactions (
            id, invoice_number, customer_id, subtotal_cents, discount_cents,
            loyalty_discount_cents, loyalty_points_awarded, loyalty_points_redeemed,
            redemption_event_id, total_cents, refunded, refund_amount_cents,
            refund_reason, refunded_at, performed_by, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
        "#,
    )
    .bind(&transaction.id)
    .bind(&transaction.invoice_number)
    .bind(&transaction.customer_id)
    .bind(transaction.subtotal_cents)
    .bind(transaction.discount_cents)
    .bind(transaction.loyalty_discount_cents)
    .bind(transaction.loyalty_points_awarded)
    .bind(transaction.loyalty_points_redeemed)
    .bind(&transaction.redemption_event_id)
    .bind(transaction.total_cents)
    .bind(transaction.refunded)
    .bind(transaction.refund_amount_cents)
    .bind(&transaction.refund_reason)
    .bind(transaction.refunded_at)
    .bind(&transaction.performed_by)
    .bind(transaction.created_at)
    .execute(&mut *conn)
    .await?;

    for item in &transaction.items {
        insert_item(&mut *conn, item).await?;
    }

    Ok(())
}

async fn insert_item(conn: &mut SqliteConnection, item: &TransactionItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO transaction_items (
            id, transaction_id, product_id, sku_snapshot, quantity, unit_price_cents,
            subtotal_cents, unit_cost_cents, cost_cents, refunded_quantity
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&item.id)
    .bind(&item.transaction_id)
    .bind(&item.product_id)
    .bind(&item.sku_snapshot)
    .bind(item.quantity)
    .bind(item.unit_price_cents)
    .bind(item.subtotal_cents)
    .bind(item.unit_cost_cents)
    .bind(item.cost_cents)
    .bind(item.refunded_quantity)
    .execute(conn)
    .await?;

    Ok(())
}

/// Loads a transaction with its lines.
pub async fn get(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Transaction>> {
    let transaction = sqlx::query_as::<_, Transaction>(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    with_items(conn, transaction).await
}

pub async fn get_by_invoice(
    conn: &mut SqliteConnection,
    invoice_number: &str,
) -> DbResult<Option<Transaction>> {
    let transaction = sqlx::query_as::<_, Transaction>(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE invoice_number = ?1"
    ))
    .bind(invoice_number)
    .fetch_optional(&mut *conn)
    .await?;

    with_items(conn, transaction).await
}

async fn with_items(
    conn: &mut SqliteConnection,
    transaction: Option<Transaction>,
) -> DbResult<Option<Transaction>> {
    match transaction {
        Some(mut transaction) => {
            transaction.items = items(conn, &transaction.id).await?;
            Ok(Some(transaction))
        }
        None => Ok(None),
    }
}

/// Lines of a transaction in the order they were rung up.
pub async fn items(
    conn: &mut SqliteConnection,
    transaction_id: &str,
) -> DbResult<Vec<TransactionItem>> {
    let items = sqlx::query_as::<_, TransactionItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM transaction_items WHERE transaction_id = ?1 ORDER BY rowid"
    ))
    .bind(transaction_id)
    .fetch_all(conn)
    .await?;

    Ok(items)
}

/// Id of the transaction that already folded in a standalone redemption.
pub async fn redemption_claimed_by(
    conn: &mut SqliteConnection,
    event_id: &str,
) -> DbResult<Option<String>> {
    let id: Option<String> =
        sqlx::query_scalar("SELECT id FROM transactions WHERE redemption_event_id = ?1")
            .bind(event_id)
            .fetch_optional(conn)
            .await?;

    Ok(id)
}

/// Flips `refunded` and stores the refund metadata.
///
/// Returns `false` when the transaction is missing or already refunded.
pub async fn mark_refunded(
    conn: &mut SqliteConnection,
    id: &str,
    amount_cents: i64,
    reason: &str,
    at: DateTime<Utc>,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE transactions
        SET refunded = 1, refund_amount_cents = ?2, refund_reason = ?3, refunded_at = ?4
        WHERE id = ?1 AND refunded = 0
        "#,
    )
    .bind(id)
    .bind(amount_cents)
    .bind(reason)
    .bind(at)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Records `quantity` more returned units on a line.
///
/// Returns `false` if that would exceed the units sold.
pub async fn add_refunded_quantity(
    conn: &mut SqliteConnection,
    item_id: &str,
    quantity: i64,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE transaction_items
        SET refunded_quantity = refunded_quantity + ?2
        WHERE id = ?1 AND refunded_quantity + ?2 <= quantity
        "#,
    )
    .bind(item_id)
    .bind(quantity)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Removes a transaction and its lines. Returns `false` if it did not exist.
pub async fn delete(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
    debug!(id = %id, "Deleting transaction");

    sqlx::query("DELETE FROM transaction_items WHERE transaction_id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    let result = sqlx::query("DELETE FROM transactions WHERE id = ?1")
        .bind(id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected() == 1)
}

// =============================================================================
// Reader
// =============================================================================

#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Transaction>> {
        let mut conn = self.pool.acquire().await?;
        get(&mut conn, id).await
    }

    pub async fn get_by_invoice(&self, invoice_number: &str) -> DbResult<Option<Transaction>> {
        let mut conn = self.pool.acquire().await?;
        get_by_invoice(&mut conn, invoice_number).await
    }

    /// Newest transactions first, with their lines.
    pub async fn recent(&self, limit: u32) -> DbResult<Vec<Transaction>> {
        let mut conn = self.pool.acquire().await?;

        let mut transactions = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;

        for transaction in &mut transactions {
            transaction.items = items(&mut conn, &transaction.id).await?;
        }

        Ok(transactions)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
