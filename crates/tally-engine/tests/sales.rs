mod common;

use common::*;
use tally_core::{CoreError, LoyaltyEventType, RecordType, ReferenceType, ValidationError};
use tally_db::SortOrder;

#[tokio::test]
async fn test_sale_walks_lots_oldest_first() {
    let engine = engine().await;
    let coffee = product(&engine, "COFFEE", 900, 0).await;
    receive(&engine, &coffee.id, &[(5, 1000), (5, 1200)]).await;

    let sale = engine
        .create_sale(sale(vec![line(&coffee.id, 7, 1500)]), CASHIER)
        .await
        .unwrap();

    let item = &sale.items[0];
    assert_eq!(item.cost_cents, 7400);
    // (5 × 1000 + 2 × 1200) / 7 = 1057.14
    assert_eq!(item.unit_cost_cents, 1057);
    assert_eq!(item.subtotal_cents, 10_500);
    assert_eq!(sale.total_cents, 10_500);

    let lots = engine.open_lots(&coffee.id).await.unwrap();
    assert_eq!(lots.len(), 1);
    assert_eq!(lots[0].unit_cost_cents, 1200);
    assert_eq!(lots[0].remaining_quantity, 3);
    assert_eq!(engine.product(&coffee.id).await.unwrap().quantity, 3);
}

#[tokio::test]
async fn test_legacy_stock_is_sold_first_at_lot_average() {
    let engine = engine().await;
    // 4 untracked units plus one lot of 6 @ 8.00
    let beans = product(&engine, "BEANS", 500, 4).await;
    receive(&engine, &beans.id, &[(6, 800)]).await;
    assert_eq!(engine.product(&beans.id).await.unwrap().quantity, 10);

    let sale = engine
        .create_sale(sale(vec![line(&beans.id, 8, 1000)]), CASHIER)
        .await
        .unwrap();

    assert_eq!(sale.items[0].unit_cost_cents, 800);
    assert_eq!(sale.items[0].cost_cents, 6400);

    let records = engine
        .product_history(&beans.id, SortOrder::Ascending, 50)
        .await
        .unwrap();
    let sales: Vec<_> = records
        .iter()
        .filter(|r| r.record_type == RecordType::Sale)
        .collect();
    assert_eq!(sales.len(), 2);
    assert!(sales[0].legacy);
    assert_eq!(sales[0].quantity, 4);
    assert_eq!(sales[1].quantity, 4);
    assert!(sales[1].source_lot_id.is_some());
    assert_eq!(sales.iter().map(|r| r.quantity).sum::<i64>(), 8);

    let lots = engine.open_lots(&beans.id).await.unwrap();
    assert_eq!(lots[0].remaining_quantity, 2);
    assert_eq!(engine.product(&beans.id).await.unwrap().quantity, 2);
}

#[tokio::test]
async fn test_untracked_product_costs_at_product_cost() {
    let engine = engine().await;
    let mug = product(&engine, "MUG", 400, 10).await;

    let sale = engine
        .create_sale(sale(vec![line(&mug.id, 3, 900)]), CASHIER)
        .await
        .unwrap();

    assert_eq!(sale.items[0].unit_cost_cents, 400);
    assert_eq!(sale.cost_of_goods().cents(), 1200);
}

#[tokio::test]
async fn test_insufficient_inventory_rolls_back_every_line() {
    let engine = engine().await;
    let tea = product(&engine, "TEA", 300, 0).await;
    let mug = product(&engine, "MUG", 400, 0).await;
    receive(&engine, &tea.id, &[(10, 300)]).await;
    receive(&engine, &mug.id, &[(2, 400)]).await;

    let err = engine
        .create_sale(
            sale(vec![line(&tea.id, 4, 600), line(&mug.id, 3, 900)]),
            CASHIER,
        )
        .await
        .unwrap_err();

    match err.core() {
        Some(CoreError::InsufficientInventory {
            sku,
            available,
            requested,
        }) => {
            assert_eq!(sku, "MUG");
            assert_eq!(*available, 2);
            assert_eq!(*requested, 3);
        }
        other => panic!("expected InsufficientInventory, got {other:?}"),
    }

    // The tea line consumed nothing either
    assert_eq!(engine.product(&tea.id).await.unwrap().quantity, 10);
    assert_eq!(engine.open_lots(&tea.id).await.unwrap()[0].remaining_quantity, 10);
    assert!(engine.recent_transactions(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_product_and_customer() {
    let engine = engine().await;
    let mug = product(&engine, "MUG", 400, 5).await;

    let err = engine
        .create_sale(sale(vec![line("ghost", 1, 100)]), CASHIER)
        .await
        .unwrap_err();
    assert!(matches!(err.core(), Some(CoreError::ProductNotFound(id)) if id == "ghost"));

    let err = engine
        .create_sale(sale_for("nobody", vec![line(&mug.id, 1, 100)]), CASHIER)
        .await
        .unwrap_err();
    assert!(matches!(err.core(), Some(CoreError::CustomerNotFound(_))));
    assert_eq!(engine.product(&mug.id).await.unwrap().quantity, 5);
}

#[tokio::test]
async fn test_duplicate_invoice_number() {
    let engine = engine().await;
    let mug = product(&engine, "MUG", 400, 5).await;

    let mut request = sale(vec![line(&mug.id, 1, 900)]);
    request.invoice_number = Some("INV-0001".to_string());
    engine.create_sale(request.clone(), CASHIER).await.unwrap();

    let err = engine.create_sale(request, CASHIER).await.unwrap_err();
    assert!(matches!(
        err.core(),
        Some(CoreError::DuplicateInvoiceNumber(invoice)) if invoice == "INV-0001"
    ));
    // The second sale's stock movement was discarded
    assert_eq!(engine.product(&mug.id).await.unwrap().quantity, 4);
}

#[tokio::test]
async fn test_generated_invoice_numbers_are_unique() {
    let engine = engine().await;
    let mug = product(&engine, "MUG", 400, 5).await;

    let first = engine
        .create_sale(sale(vec![line(&mug.id, 1, 900)]), CASHIER)
        .await
        .unwrap();
    let second = engine
        .create_sale(sale(vec![line(&mug.id, 1, 900)]), CASHIER)
        .await
        .unwrap();

    assert!(first.invoice_number.starts_with("INV-"));
    assert_ne!(first.invoice_number, second.invoice_number);
    let found = engine
        .transaction_by_invoice(&second.invoice_number)
        .await
        .unwrap();
    assert_eq!(found.id, second.id);
}

#[tokio::test]
async fn test_discount_larger_than_subtotal_is_rejected() {
    let engine = engine().await;
    let mug = product(&engine, "MUG", 400, 5).await;

    let mut request = sale(vec![line(&mug.id, 1, 900)]);
    request.discount_cents = 901;
    let err = engine.create_sale(request, CASHIER).await.unwrap_err();

    assert!(matches!(
        err.core(),
        Some(CoreError::Validation(ValidationError::ExceedsSubtotal { .. }))
    ));
}

#[tokio::test]
async fn test_sale_awards_points_and_updates_stats() {
    let engine = engine().await;
    let mug = product(&engine, "MUG", 400, 20).await;
    let regular = engine.create_customer("Ada").await.unwrap();

    let mut request = sale_for(&regular.id, vec![line(&mug.id, 12, 1000)]);
    request.discount_cents = 50;
    let sale = engine.create_sale(request, CASHIER).await.unwrap();

    // 11950 cents at one point per 100
    assert_eq!(sale.total_cents, 11_950);
    assert_eq!(sale.loyalty_points_awarded, 119);

    let after = engine.customer(&regular.id).await.unwrap();
    assert_eq!(after.loyalty_points, 119);
    assert_eq!(after.total_spent_cents, 11_950);
    assert_eq!(after.purchase_count, 1);
    assert!(after.last_purchase.is_some());

    let events = engine
        .customer_loyalty_history(&regular.id, SortOrder::Ascending, 10)
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, LoyaltyEventType::Earn);
    assert_eq!(events[0].reference_type, ReferenceType::Transaction);
    assert_eq!(events[0].reference_id, sale.id);
}

#[tokio::test]
async fn test_sale_is_readable_after_commit() {
    let engine = engine().await;
    let mug = product(&engine, "MUG", 400, 5).await;
    let tea = product(&engine, "TEA", 300, 5).await;

    let sale = engine
        .create_sale(
            sale(vec![line(&mug.id, 2, 900), line(&tea.id, 1, 600)]),
            "cashier-9",
        )
        .await
        .unwrap();

    let loaded = engine.transaction(&sale.id).await.unwrap();
    assert_eq!(loaded.items.len(), 2);
    assert_eq!(loaded.subtotal_cents, 2400);
    assert_eq!(loaded.performed_by, "cashier-9");
    assert_eq!(loaded.items[0].sku_snapshot, "MUG");

    let recent = engine.recent_transactions(5).await.unwrap();
    assert_eq!(recent[0].id, sale.id);
}
