//! # Loyalty Ledger
//!
//! Point balances plus their append-only event history.
//!
//! | Operation | Balance write | Shortfall |
//! |---|---|---|
//! | `award_points` | `MAX(0, balance + delta)` | clamped, event keeps the requested delta |
//! | `redeem` | guarded `balance >= points` | `InsufficientLoyaltyPoints` |
//! | `reverse` | guarded for removals | skipped with a warning |

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use tally_core::loyalty::{PointsPolicy, PurchaseContext, RedemptionRate};
use tally_core::{CoreError, Customer, LoyaltyEvent, LoyaltyEventType, Money, ReferenceType};
use tally_db::repository::{customer, loyalty};

/// One balance change to record.
#[derive(Debug, Clone)]
pub struct PointsEntry<'a> {
    pub customer_id: &'a str,
    /// Signed delta.
    pub points: i64,
    pub event_type: LoyaltyEventType,
    pub reason: String,
    pub reference_type: ReferenceType,
    pub reference_id: &'a str,
    pub monetary_value: Money,
    pub performed_by: &'a str,
    pub at: DateTime<Utc>,
}

impl PointsEntry<'_> {
    fn event(&self, id: String, reference_id: &str) -> LoyaltyEvent {
        LoyaltyEvent {
            id,
            customer_id: self.customer_id.to_string(),
            points: self.points,
            event_type: self.event_type,
            reason: self.reason.clone(),
            reference_type: self.reference_type,
            reference_id: reference_id.to_string(),
            monetary_value_cents: self.monetary_value.cents(),
            performed_by: self.performed_by.to_string(),
            created_at: self.at,
        }
    }
}

#[derive(Clone)]
pub struct LoyaltyLedger {
    policy: Arc<dyn PointsPolicy>,
    rate: RedemptionRate,
}

impl std::fmt::Debug for LoyaltyLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoyaltyLedger")
            .field("rate", &self.rate)
            .finish_non_exhaustive()
    }
}

impl LoyaltyLedger {
    pub fn new(policy: Arc<dyn PointsPolicy>, rate: RedemptionRate) -> Self {
        LoyaltyLedger { policy, rate }
    }

    pub fn rate(&self) -> RedemptionRate {
        self.rate
    }

    /// Points a purchase earns. Never negative.
    pub fn calculate_points_for_purchase(
        &self,
        total: Money,
        customer: &Customer,
        context: &PurchaseContext,
    ) -> i64 {
        self.policy
            .points_for_purchase(total, customer, context)
            .max(0)
    }

    /// Applies a signed delta, clamping the balance at zero.
    ///
    /// Zero points is a no-op and returns `None`.
    pub async fn award_points(
        &self,
        conn: &mut SqliteConnection,
        entry: PointsEntry<'_>,
    ) -> EngineResult<Option<LoyaltyEvent>> {
        if entry.points == 0 {
            return Ok(None);
        }

        let balance = customer::adjust_points(&mut *conn, entry.customer_id, entry.points)
            .await
            .map_err(|err| match err {
                tally_db::DbError::NotFound { .. } => {
                    CoreError::CustomerNotFound(entry.customer_id.to_string()).into()
                }
                other => EngineError::from(other),
            })?;

        let event = entry.event(Uuid::new_v4().to_string(), entry.reference_id);
        loyalty::insert(&mut *conn, &event).await?;

        debug!(
            customer_id = %entry.customer_id,
            points = entry.points,
            balance,
            "Points applied"
        );
        Ok(Some(event))
    }

    /// Takes `entry.points` (a positive count) off the balance.
    ///
    /// The stored event carries the negated count. When `entry.reference_id`
    /// is empty the event references itself, which is how standalone
    /// redemptions are keyed.
    pub async fn redeem(
        &self,
        conn: &mut SqliteConnection,
        entry: PointsEntry<'_>,
    ) -> EngineResult<LoyaltyEvent> {
        let points = entry.points;

        if customer::deduct_points(&mut *conn, entry.customer_id, points)
            .await?
            .is_none()
        {
            let customer = customer::get(&mut *conn, entry.customer_id)
                .await?
                .ok_or_else(|| CoreError::CustomerNotFound(entry.customer_id.to_string()))?;
            return Err(CoreError::InsufficientLoyaltyPoints {
                customer_id: customer.id,
                available: customer.loyalty_points,
                requested: points,
            }
            .into());
        }

        let id = Uuid::new_v4().to_string();
        let reference_id = if entry.reference_id.is_empty() {
            id.clone()
        } else {
            entry.reference_id.to_string()
        };
        let mut event = entry.event(id, &reference_id);
        event.points = -points;
        event.event_type = LoyaltyEventType::Redeem;
        loyalty::insert(&mut *conn, &event).await?;

        debug!(customer_id = %entry.customer_id, points, "Points redeemed");
        Ok(event)
    }

    /// Undoes an earlier earn (negative delta) or redeem (positive delta).
    ///
    /// A removal the balance cannot cover is skipped and logged; the parent
    /// operation carries on.
    pub async fn reverse(
        &self,
        conn: &mut SqliteConnection,
        entry: PointsEntry<'_>,
    ) -> EngineResult<Option<LoyaltyEvent>> {
        if entry.points == 0 {
            return Ok(None);
        }

        if entry.points > 0 {
            return self.award_points(conn, entry).await;
        }

        let wanted = -entry.points;
        match customer::deduct_points(&mut *conn, entry.customer_id, wanted).await? {
            Some(balance) => {
                let event = entry.event(Uuid::new_v4().to_string(), entry.reference_id);
                loyalty::insert(&mut *conn, &event).await?;
                debug!(customer_id = %entry.customer_id, points = entry.points, balance, "Points reversed");
                Ok(Some(event))
            }
            None => {
                warn!(
                    customer_id = %entry.customer_id,
                    points = wanted,
                    reference_id = %entry.reference_id,
                    "Balance too low to reverse points, skipping reversal"
                );
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::config::LoyaltyConfig;
    use tally_core::loyalty::RatePolicy;
    use tally_db::{Database, DbConfig};

    fn ledger() -> LoyaltyLedger {
        LoyaltyLedger::new(
            Arc::new(RatePolicy::new(LoyaltyConfig::default())),
            RedemptionRate::new(1),
        )
    }

    fn entry(points: i64, event_type: LoyaltyEventType) -> PointsEntry<'static> {
        PointsEntry {
            customer_id: "c-1",
            points,
            event_type,
            reason: "test".to_string(),
            reference_type: ReferenceType::Transaction,
            reference_id: "t-1",
            monetary_value: Money::zero(),
            performed_by: "tester",
            at: Utc::now(),
        }
    }

    async fn setup(points: i64) -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut uow = db.begin(0).await.unwrap();
        customer::insert(
            uow.conn().unwrap(),
            &Customer {
                id: "c-1".to_string(),
                name: "Ada".to_string(),
                loyalty_points: points,
                total_spent_cents: 0,
                purchase_count: 0,
                last_purchase: None,
                created_at: Utc::now(),
            },
        )
        .await
        .unwrap();
        uow.commit().await.unwrap();
        db
    }

    async fn balance(db: &Database) -> i64 {
        db.customers()
            .get_by_id("c-1")
            .await
            .unwrap()
            .unwrap()
            .loyalty_points
    }

    #[tokio::test]
    async fn test_award_zero_is_noop() {
        let db = setup(10).await;
        let mut uow = db.begin(0).await.unwrap();
        let event = ledger()
            .award_points(uow.conn().unwrap(), entry(0, LoyaltyEventType::Earn))
            .await
            .unwrap();
        uow.commit().await.unwrap();

        assert!(event.is_none());
        assert!(db
            .loyalty()
            .history("c-1", Default::default(), 10)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_award_negative_clamps_but_records_delta() {
        let db = setup(10).await;
        let mut uow = db.begin(0).await.unwrap();
        let event = ledger()
            .award_points(uow.conn().unwrap(), entry(-25, LoyaltyEventType::RefundReversal))
            .await
            .unwrap()
            .unwrap();
        uow.commit().await.unwrap();

        assert_eq!(event.points, -25);
        assert_eq!(balance(&db).await, 0);
    }

    #[tokio::test]
    async fn test_redeem_more_than_held() {
        let db = setup(40).await;
        let mut uow = db.begin(0).await.unwrap();
        let err = ledger()
            .redeem(uow.conn().unwrap(), entry(41, LoyaltyEventType::Redeem))
            .await
            .unwrap_err();
        uow.rollback().await;

        assert!(matches!(
            err.core(),
            Some(CoreError::InsufficientLoyaltyPoints {
                available: 40,
                requested: 41,
                ..
            })
        ));
        assert_eq!(balance(&db).await, 40);
    }

    #[tokio::test]
    async fn test_redeem_self_reference() {
        let db = setup(40).await;
        let mut e = entry(15, LoyaltyEventType::Redeem);
        e.reference_type = ReferenceType::StandaloneRedemption;
        e.reference_id = "";

        let mut uow = db.begin(0).await.unwrap();
        let event = ledger().redeem(uow.conn().unwrap(), e).await.unwrap();
        uow.commit().await.unwrap();

        assert_eq!(event.points, -15);
        assert_eq!(event.reference_id, event.id);
        assert_eq!(balance(&db).await, 25);
    }

    #[tokio::test]
    async fn test_reverse_skips_when_balance_short() {
        let db = setup(5).await;
        let mut uow = db.begin(0).await.unwrap();
        let skipped = ledger()
            .reverse(uow.conn().unwrap(), entry(-42, LoyaltyEventType::RefundReversal))
            .await
            .unwrap();
        let restored = ledger()
            .reverse(uow.conn().unwrap(), entry(10, LoyaltyEventType::RefundReversal))
            .await
            .unwrap();
        uow.commit().await.unwrap();

        assert!(skipped.is_none());
        assert!(restored.is_some());
        assert_eq!(balance(&db).await, 15);
    }

    #[tokio::test]
    async fn test_unknown_customer() {
        let db = setup(0).await;
        let mut e = entry(5, LoyaltyEventType::Earn);
        e.customer_id = "ghost";

        let mut uow = db.begin(0).await.unwrap();
        let err = ledger().award_points(uow.conn().unwrap(), e).await.unwrap_err();
        uow.rollback().await;
        assert!(matches!(err.core(), Some(CoreError::CustomerNotFound(_))));
    }
}
