mod common;

use std::sync::Arc;

use common::*;
use tally_core::config::EngineConfig;
use tally_core::loyalty::NoPoints;
use tally_core::{CoreError, LoyaltyEventType, LoyaltyRedemption, ReferenceType};
use tally_db::{Database, DbConfig, SortOrder};
use tally_engine::TransactionEngine;

#[tokio::test]
async fn test_redeeming_more_than_held_changes_nothing() {
    let engine = engine().await;
    let regular = customer_with_points(&engine, 40).await;
    let events_before = engine
        .customer_loyalty_history(&regular.id, SortOrder::Ascending, 50)
        .await
        .unwrap()
        .len();

    let err = engine
        .redeem_loyalty_points(&regular.id, 41, CASHIER)
        .await
        .unwrap_err();

    assert!(matches!(
        err.core(),
        Some(CoreError::InsufficientLoyaltyPoints {
            available: 40,
            requested: 41,
            ..
        })
    ));
    assert_eq!(engine.customer(&regular.id).await.unwrap().loyalty_points, 40);
    assert_eq!(
        engine
            .customer_loyalty_history(&regular.id, SortOrder::Ascending, 50)
            .await
            .unwrap()
            .len(),
        events_before
    );
}

#[tokio::test]
async fn test_inline_redemption_short_of_points_aborts_the_sale() {
    let engine = engine().await;
    let mug = product(&engine, "MUG", 400, 10).await;
    let regular = customer_with_points(&engine, 20).await;

    let mut request = sale_for(&regular.id, vec![line(&mug.id, 2, 900)]);
    request.loyalty_redemption = inline_redemption(25);
    let err = engine.create_sale(request, CASHIER).await.unwrap_err();

    assert!(matches!(
        err.core(),
        Some(CoreError::InsufficientLoyaltyPoints { requested: 25, .. })
    ));
    assert_eq!(engine.product(&mug.id).await.unwrap().quantity, 10);
    assert_eq!(engine.customer(&regular.id).await.unwrap().loyalty_points, 20);
}

#[tokio::test]
async fn test_inline_redemption_discounts_the_sale() {
    let engine = engine().await;
    let mug = product(&engine, "MUG", 400, 10).await;
    let regular = customer_with_points(&engine, 100).await;

    let mut request = sale_for(&regular.id, vec![line(&mug.id, 2, 900)]);
    request.loyalty_redemption = inline_redemption(60);
    let sale = engine.create_sale(request, CASHIER).await.unwrap();

    assert_eq!(sale.loyalty_discount_cents, 60);
    assert_eq!(sale.loyalty_points_redeemed, 60);
    assert_eq!(sale.total_cents, 1740);
    assert_eq!(sale.loyalty_points_awarded, 17);
    assert!(sale.redemption_event_id.is_some());

    // 100 - 60 + 17
    assert_eq!(engine.customer(&regular.id).await.unwrap().loyalty_points, 57);
}

#[tokio::test]
async fn test_prepaid_redemption_is_claimed_once() {
    let engine = engine().await;
    let mug = product(&engine, "MUG", 400, 10).await;
    let regular = customer_with_points(&engine, 50).await;

    let redeemed = engine
        .redeem_loyalty_points(&regular.id, 40, CASHIER)
        .await
        .unwrap();
    assert_eq!(redeemed.customer.loyalty_points, 10);
    assert_eq!(redeemed.redemption.points, 40);
    assert_eq!(redeemed.redemption.value_cents, 40);

    let event_id = redeemed.redemption.event_id.clone();
    let event = engine
        .customer_loyalty_history(&regular.id, SortOrder::Descending, 1)
        .await
        .unwrap()
        .remove(0);
    assert_eq!(event.id, event_id);
    assert_eq!(event.event_type, LoyaltyEventType::Redeem);
    assert_eq!(event.reference_type, ReferenceType::StandaloneRedemption);
    assert_eq!(event.reference_id, event_id);
    assert_eq!(event.points, -40);

    let mut request = sale_for(&regular.id, vec![line(&mug.id, 1, 900)]);
    request.loyalty_redemption = Some(LoyaltyRedemption::Prepaid {
        event_id: event_id.clone(),
    });
    let sale = engine.create_sale(request.clone(), CASHIER).await.unwrap();

    assert_eq!(sale.loyalty_discount_cents, 40);
    assert_eq!(sale.loyalty_points_redeemed, 40);
    assert_eq!(sale.total_cents, 860);
    assert_eq!(sale.redemption_event_id.as_deref(), Some(event_id.as_str()));
    // No second deduction: 10 + 8 earned
    assert_eq!(engine.customer(&regular.id).await.unwrap().loyalty_points, 18);

    let err = engine.create_sale(request, CASHIER).await.unwrap_err();
    assert!(matches!(err.core(), Some(CoreError::InvalidRedemption { .. })));
    assert_eq!(engine.product(&mug.id).await.unwrap().quantity, 9);
}

#[tokio::test]
async fn test_prepaid_redemption_of_another_customer() {
    let engine = engine().await;
    let mug = product(&engine, "MUG", 400, 10).await;
    let owner = customer_with_points(&engine, 50).await;
    let other = engine.create_customer("Mallory").await.unwrap();

    let redeemed = engine
        .redeem_loyalty_points(&owner.id, 30, CASHIER)
        .await
        .unwrap();

    let mut request = sale_for(&other.id, vec![line(&mug.id, 1, 900)]);
    request.loyalty_redemption = Some(LoyaltyRedemption::Prepaid {
        event_id: redeemed.redemption.event_id,
    });
    let err = engine.create_sale(request, CASHIER).await.unwrap_err();

    assert!(matches!(err.core(), Some(CoreError::InvalidRedemption { .. })));
}

#[tokio::test]
async fn test_earn_event_cannot_be_used_as_prepaid() {
    let engine = engine().await;
    let mug = product(&engine, "MUG", 400, 10).await;
    let regular = customer_with_points(&engine, 50).await;
    let earn = engine
        .customer_loyalty_history(&regular.id, SortOrder::Ascending, 1)
        .await
        .unwrap()
        .remove(0);

    let mut request = sale_for(&regular.id, vec![line(&mug.id, 1, 900)]);
    request.loyalty_redemption = Some(LoyaltyRedemption::Prepaid { event_id: earn.id });
    let err = engine.create_sale(request, CASHIER).await.unwrap_err();

    assert!(matches!(err.core(), Some(CoreError::InvalidRedemption { .. })));
}

#[tokio::test]
async fn test_redemption_needs_a_customer() {
    let engine = engine().await;
    let mug = product(&engine, "MUG", 400, 10).await;

    let mut request = sale(vec![line(&mug.id, 1, 900)]);
    request.loyalty_redemption = inline_redemption(10);
    let err = engine.create_sale(request, CASHIER).await.unwrap_err();
    assert!(matches!(err.core(), Some(CoreError::Validation(_))));

    let err = engine
        .redeem_loyalty_points("nobody", 5, CASHIER)
        .await
        .unwrap_err();
    assert!(matches!(err.core(), Some(CoreError::CustomerNotFound(_))));
}

#[tokio::test]
async fn test_custom_policy_is_used() {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let engine = TransactionEngine::with_policy(db, EngineConfig::default(), Arc::new(NoPoints));
    let mug = product(&engine, "MUG", 400, 10).await;
    let regular = engine.create_customer("Ada").await.unwrap();

    let sale = engine
        .create_sale(sale_for(&regular.id, vec![line(&mug.id, 5, 900)]), CASHIER)
        .await
        .unwrap();

    assert_eq!(sale.loyalty_points_awarded, 0);
    let after = engine.customer(&regular.id).await.unwrap();
    assert_eq!(after.loyalty_points, 0);
    assert_eq!(after.purchase_count, 1);
    assert!(engine
        .customer_loyalty_history(&regular.id, SortOrder::Ascending, 10)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_deleted_sale_releases_prepaid_redemption_without_refunding_it() {
    let engine = engine().await;
    let mug = product(&engine, "MUG", 400, 10).await;
    let regular = customer_with_points(&engine, 50).await;

    let redeemed = engine
        .redeem_loyalty_points(&regular.id, 40, CASHIER)
        .await
        .unwrap();
    let event_id = redeemed.redemption.event_id;

    let mut request = sale_for(&regular.id, vec![line(&mug.id, 1, 900)]);
    request.loyalty_redemption = Some(LoyaltyRedemption::Prepaid {
        event_id: event_id.clone(),
    });
    let first = engine.create_sale(request.clone(), CASHIER).await.unwrap();
    assert_eq!(engine.customer(&regular.id).await.unwrap().loyalty_points, 18);

    engine.delete_transaction(&first.id, CASHIER).await.unwrap();

    // Earned 8 taken back, the 40 stay spent
    assert_eq!(engine.customer(&regular.id).await.unwrap().loyalty_points, 10);
    let events = engine
        .customer_loyalty_history(&regular.id, SortOrder::Ascending, 50)
        .await
        .unwrap();
    assert!(events
        .iter()
        .all(|e| !(e.event_type == LoyaltyEventType::RefundReversal && e.points > 0)));

    let second = engine.create_sale(request, CASHIER).await.unwrap();
    assert_eq!(second.loyalty_discount_cents, 40);
    assert_eq!(second.redemption_event_id.as_deref(), Some(event_id.as_str()));
    // One deduction of 40 paid for one discount of 40
    assert_eq!(engine.customer(&regular.id).await.unwrap().loyalty_points, 18);
}

#[tokio::test]
async fn test_delete_restores_redeemed_points_before_taking_back_earned() {
    let engine = engine().await;
    let mug = product(&engine, "MUG", 400, 10).await;
    let regular = customer_with_points(&engine, 50).await;

    let mut request = sale_for(&regular.id, vec![line(&mug.id, 4, 1000)]);
    request.loyalty_redemption = inline_redemption(30);
    let sale = engine.create_sale(request, CASHIER).await.unwrap();
    assert_eq!(sale.loyalty_points_awarded, 39);

    // 50 - 30 + 39 = 59, spend down to 9
    engine
        .redeem_loyalty_points(&regular.id, 50, CASHIER)
        .await
        .unwrap();

    engine.delete_transaction(&sale.id, CASHIER).await.unwrap();

    // 9 + 30 restored - 39 earned
    assert_eq!(engine.customer(&regular.id).await.unwrap().loyalty_points, 0);
    let events = engine
        .customer_loyalty_history(&regular.id, SortOrder::Descending, 2)
        .await
        .unwrap();
    assert_eq!(events[0].event_type, LoyaltyEventType::RefundReversal);
    assert_eq!(events[0].points, -39);
    assert_eq!(events[1].points, 30);
}
