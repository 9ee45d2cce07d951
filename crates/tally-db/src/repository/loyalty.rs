//! # Loyalty Event Repository
//!
//! Append-only history of point balance changes.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use super::SortOrder;
use crate::error::DbResult;
use tally_core::LoyaltyEvent;

const EVENT_COLUMNS: &str = "id, customer_id, points, event_type, reason, reference_type, \
     reference_id, monetary_value_cents, performed_by, created_at";

pub async fn insert(conn: &mut SqliteConnection, event: &LoyaltyEvent) -> DbResult<()> {
    debug!(
        customer_id = %event.customer_id,
        points = event.points,
        event_type = ?event.event_type,
        "Appending loyalty event"
    );

    sqlx::query(
        r#"
        INSERT INTO loyalty_events (
            id, customer_id, points, event_type, reason, reference_type,
            reference_id, monetary_value_cents, performed_by, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&event.id)
    .bind(&event.customer_id)
    .bind(event.points)
    .bind(event.event_type)
    .bind(&event.reason)
    .bind(event.reference_type)
    .bind(&event.reference_id)
    .bind(event.monetary_value_cents)
    .bind(&event.performed_by)
    .bind(event.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn get(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<LoyaltyEvent>> {
    let event = sqlx::query_as::<_, LoyaltyEvent>(&format!(
        "SELECT {EVENT_COLUMNS} FROM loyalty_events WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(event)
}

#[derive(Debug, Clone)]
pub struct LoyaltyRepository {
    pool: SqlitePool,
}

impl LoyaltyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LoyaltyRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<LoyaltyEvent>> {
        let mut conn = self.pool.acquire().await?;
        get(&mut conn, id).await
    }

    /// A customer's events ordered by time.
    pub async fn history(
        &self,
        customer_id: &str,
        order: SortOrder,
        limit: u32,
    ) -> DbResult<Vec<LoyaltyEvent>> {
        let direction = order.sql();
        let events = sqlx::query_as::<_, LoyaltyEvent>(&format!(
            "SELECT {EVENT_COLUMNS} FROM loyalty_events
             WHERE customer_id = ?1
             ORDER BY created_at {direction}, rowid {direction}
             LIMIT ?2"
        ))
        .bind(customer_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Sum of every recorded delta. Matches the stored balance unless a
    /// clamp at zero engaged.
    pub async fn points_total(&self, customer_id: &str) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(points), 0) FROM loyalty_events WHERE customer_id = ?1",
        )
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }
}
