//! # Customer Repository
//!
//! Customers, their point balances and purchase statistics.
//!
//! Balance writes are single statements so the stored balance can never be
//! read and written back stale.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tally_core::Customer;

const CUSTOMER_COLUMNS: &str =
    "id, name, loyalty_points, total_spent_cents, purchase_count, last_purchase, created_at";

// =============================================================================
// Unit-of-work functions
// =============================================================================

pub async fn get(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>(&format!(
        "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(customer)
}

pub async fn insert(conn: &mut SqliteConnection, customer: &Customer) -> DbResult<()> {
    debug!(id = %customer.id, "Inserting customer");

    sqlx::query(
        r#"
        INSERT INTO customers (
            id, name, loyalty_points, total_spent_cents, purchase_count, last_purchase, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&customer.id)
    .bind(&customer.name)
    .bind(customer.loyalty_points)
    .bind(customer.total_spent_cents)
    .bind(customer.purchase_count)
    .bind(customer.last_purchase)
    .bind(customer.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Adds `delta` points, clamping the stored balance at zero.
///
/// Returns the new balance.
pub async fn adjust_points(conn: &mut SqliteConnection, id: &str, delta: i64) -> DbResult<i64> {
    let balance: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE customers
        SET loyalty_points = MAX(0, loyalty_points + ?2)
        WHERE id = ?1
        RETURNING loyalty_points
        "#,
    )
    .bind(id)
    .bind(delta)
    .fetch_optional(conn)
    .await?;

    balance.ok_or_else(|| DbError::not_found("Customer", id))
}

/// Removes `points` only if the balance covers them.
///
/// Returns the new balance, or `None` when the balance is short.
pub async fn deduct_points(
    conn: &mut SqliteConnection,
    id: &str,
    points: i64,
) -> DbResult<Option<i64>> {
    let balance: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE customers
        SET loyalty_points = loyalty_points - ?2
        WHERE id = ?1 AND loyalty_points >= ?2
        RETURNING loyalty_points
        "#,
    )
    .bind(id)
    .bind(points)
    .fetch_optional(conn)
    .await?;

    Ok(balance)
}

/// Counts a completed sale towards the customer's statistics.
pub async fn record_purchase(
    conn: &mut SqliteConnection,
    id: &str,
    total_cents: i64,
    at: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE customers
        SET total_spent_cents = total_spent_cents + ?2,
            purchase_count = purchase_count + 1,
            last_purchase = ?3
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(total_cents)
    .bind(at)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Customer", id));
    }
    Ok(())
}

/// Takes money (and optionally purchases) back out of the statistics.
/// Both counters floor at zero.
pub async fn reverse_purchase(
    conn: &mut SqliteConnection,
    id: &str,
    amount_cents: i64,
    purchases: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE customers
        SET total_spent_cents = MAX(0, total_spent_cents - ?2),
            purchase_count = MAX(0, purchase_count - ?3)
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(amount_cents)
    .bind(purchases)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Customer", id));
    }
    Ok(())
}

// =============================================================================
// Reader
// =============================================================================

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let mut conn = self.pool.acquire().await?;
        get(&mut conn, id).await
    }

    /// Customers ordered by name.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY name LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
