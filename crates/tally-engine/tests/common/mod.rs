//! Shared fixtures for the engine integration tests.

#![allow(dead_code)]

use tally_core::config::EngineConfig;
use tally_core::{
    Customer, LoyaltyRedemption, NewProduct, Product, RefundLine, SaleLine, SaleRequest,
};
use tally_db::{Database, DbConfig};
use tally_engine::TransactionEngine;

pub const CASHIER: &str = "cashier-1";

pub async fn engine() -> TransactionEngine {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    TransactionEngine::new(db, EngineConfig::default())
}

/// Registers a product with `opening` units of untracked stock.
pub async fn product(engine: &TransactionEngine, sku: &str, cost_cents: i64, opening: i64) -> Product {
    engine
        .create_product(NewProduct {
            sku: sku.to_string(),
            name: format!("{sku} item"),
            cost_cents,
            reorder_level: 0,
            opening_quantity: opening,
        })
        .await
        .unwrap()
}

/// Receives one lot per `(quantity, unit cost)` pair, oldest first.
pub async fn receive(engine: &TransactionEngine, product_id: &str, lots: &[(i64, i64)]) {
    for (i, (quantity, cost)) in lots.iter().enumerate() {
        engine
            .receive_stock(product_id, *quantity, *cost, &format!("PO-{i}"), CASHIER)
            .await
            .unwrap();
    }
}

pub async fn customer_with_points(engine: &TransactionEngine, points: i64) -> Customer {
    let customer = engine.create_customer("Grace Hopper").await.unwrap();
    if points == 0 {
        return customer;
    }

    // Earn points the normal way: one point per 100 cents spent.
    let stock = product(engine, &format!("PTS-{}", &customer.id[..8]), 1, points).await;
    engine
        .create_sale(
            SaleRequest {
                customer_id: Some(customer.id.clone()),
                ..sale(vec![line(&stock.id, points, 100)])
            },
            CASHIER,
        )
        .await
        .unwrap();
    engine.customer(&customer.id).await.unwrap()
}

pub fn line(product_id: &str, quantity: i64, unit_price_cents: i64) -> SaleLine {
    SaleLine {
        product_id: product_id.to_string(),
        quantity,
        unit_price_cents,
    }
}

pub fn sale(items: Vec<SaleLine>) -> SaleRequest {
    SaleRequest {
        items,
        customer_id: None,
        discount_cents: 0,
        loyalty_redemption: None,
        invoice_number: None,
    }
}

pub fn sale_for(customer_id: &str, items: Vec<SaleLine>) -> SaleRequest {
    SaleRequest {
        customer_id: Some(customer_id.to_string()),
        ..sale(items)
    }
}

pub fn inline_redemption(amount_cents: i64) -> Option<LoyaltyRedemption> {
    Some(LoyaltyRedemption::Inline { amount_cents })
}

pub fn refund_line(product_id: &str, quantity: i64) -> RefundLine {
    RefundLine {
        product_id: product_id.to_string(),
        quantity,
    }
}
