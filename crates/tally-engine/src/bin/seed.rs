//! # Demo Ledger Seeder
//!
//! Builds a small ledger for development: a few products with legacy and
//! lot-tracked stock, a loyalty customer, some sales and a partial refund.
//!
//! ## Usage
//! ```bash
//! # Seed ./tally_dev.db
//! cargo run -p tally-engine --bin seed
//!
//! # Specify database path
//! cargo run -p tally-engine --bin seed -- --db ./data/tally.db
//!
//! # Watch the engines work
//! RUST_LOG=tally=debug cargo run -p tally-engine --bin seed
//! ```
//!
//! Loyalty and invoice settings come from `TALLY_*` environment variables.

use std::env;

use tally_core::config::EngineConfig;
use tally_core::{
    LoyaltyRedemption, Money, NewProduct, RefundLine, RefundRequest, SaleLine, SaleRequest,
};
use tally_db::{Database, DbConfig, SortOrder};
use tally_engine::{init_tracing, TransactionEngine};

const SEED_USER: &str = "seed";

/// (sku, name, cost, opening legacy stock, reorder level)
const PRODUCTS: &[(&str, &str, i64, i64, i64)] = &[
    ("COF-1KG", "House Blend Coffee 1kg", 900, 4, 5),
    ("TEA-100", "Green Tea 100 bags", 350, 0, 10),
    ("MUG-STD", "Stoneware Mug", 400, 12, 3),
];

/// (sku, quantity, unit cost, purchase order)
const RECEIPTS: &[(&str, i64, i64, &str)] = &[
    ("COF-1KG", 6, 800, "PO-1001"),
    ("COF-1KG", 10, 1000, "PO-1002"),
    ("TEA-100", 20, 300, "PO-1003"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./tally_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally Demo Ledger Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./tally_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Tally Demo Ledger Seeder");
    println!("========================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let engine = TransactionEngine::new(db, EngineConfig::from_env()?);

    // Products and goods receipts
    let mut ids = Vec::new();
    for (sku, name, cost, opening, reorder) in PRODUCTS {
        let product = engine
            .create_product(NewProduct {
                sku: sku.to_string(),
                name: name.to_string(),
                cost_cents: *cost,
                reorder_level: *reorder,
                opening_quantity: *opening,
            })
            .await?;
        ids.push((*sku, product.id));
    }
    let id_of = |sku: &str| {
        ids.iter()
            .find(|(s, _)| *s == sku)
            .map(|(_, id)| id.clone())
            .unwrap_or_default()
    };

    for (sku, quantity, cost, po) in RECEIPTS {
        engine
            .receive_stock(&id_of(*sku), *quantity, *cost, po, SEED_USER)
            .await?;
    }
    println!("✓ {} products, {} receipts", PRODUCTS.len(), RECEIPTS.len());

    // A regular with some history
    let regular = engine.create_customer("Ada Lovelace").await?;

    let first = engine
        .create_sale(
            SaleRequest {
                items: vec![
                    SaleLine {
                        product_id: id_of("COF-1KG"),
                        quantity: 7,
                        unit_price_cents: 1500,
                    },
                    SaleLine {
                        product_id: id_of("MUG-STD"),
                        quantity: 2,
                        unit_price_cents: 900,
                    },
                ],
                customer_id: Some(regular.id.clone()),
                discount_cents: 0,
                loyalty_redemption: None,
                invoice_number: None,
            },
            SEED_USER,
        )
        .await?;
    println!(
        "✓ Sale {}: total {}, cost of goods {}, {} points",
        first.invoice_number,
        first.total(),
        first.cost_of_goods(),
        first.loyalty_points_awarded
    );

    let second = engine
        .create_sale(
            SaleRequest {
                items: vec![SaleLine {
                    product_id: id_of("TEA-100"),
                    quantity: 3,
                    unit_price_cents: 600,
                }],
                customer_id: Some(regular.id.clone()),
                discount_cents: 100,
                loyalty_redemption: Some(LoyaltyRedemption::Inline { amount_cents: 50 }),
                invoice_number: None,
            },
            SEED_USER,
        )
        .await?;
    println!(
        "✓ Sale {}: total {}, redeemed {} points",
        second.invoice_number,
        second.total(),
        second.loyalty_points_redeemed
    );

    let refunded = engine
        .refund(
            &first.id,
            RefundRequest::partial(
                vec![RefundLine {
                    product_id: id_of("MUG-STD"),
                    quantity: 1,
                }],
                "Chipped handle",
            ),
            SEED_USER,
        )
        .await?;
    println!(
        "✓ Refunded {} on {}",
        Money::from_cents(refunded.refund_amount_cents),
        refunded.invoice_number
    );

    // Summary
    println!();
    let customer = engine.customer(&regular.id).await?;
    println!(
        "{}: {} points, {} purchases",
        customer.name, customer.loyalty_points, customer.purchase_count
    );
    for lot in engine.open_lots(&id_of("COF-1KG")).await? {
        println!("  COF-1KG lot {}: {} left @ {}", lot.reference_id, lot.remaining_quantity, lot.unit_cost());
    }
    let history = engine
        .product_history(&id_of("COF-1KG"), SortOrder::Descending, 10)
        .await?;
    println!("  COF-1KG ledger entries: {}", history.len());
    for product in engine.products_needing_reorder().await? {
        println!("  Reorder {} ({} on hand)", product.sku, product.quantity);
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
