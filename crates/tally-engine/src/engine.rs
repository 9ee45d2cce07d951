//! # Transaction Engine
//!
//! Every public write here is one unit of work: the whole sequence commits
//! or none of it does.
//!
//! ## Sale Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_sale(request, performed_by)                                     │
//! │       │                                                                 │
//! │       ├── validate_sale_request()          (before BEGIN)              │
//! │       │                                                                 │
//! │  BEGIN IMMEDIATE ───────────────────────────────────────────────────── │
//! │       ├── load customer                                                │
//! │       ├── per line: load product, FIFO consume, snapshot cost         │
//! │       ├── inline redeem / claim prepaid redemption                     │
//! │       ├── award points, customer purchase stats                        │
//! │       └── insert transaction + items       (last)                     │
//! │  COMMIT ────────────────────────────────────────────────────────────── │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Readers go through the pool. With an in-memory database the pool holds a
//! single connection, so never call a reader from inside a unit of work.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, info};
use uuid::Uuid;

use crate::costing::{FifoCostingEngine, Movement};
use crate::error::{EngineError, EngineResult};
use crate::loyalty::{LoyaltyLedger, PointsEntry};
use tally_core::config::EngineConfig;
use tally_core::loyalty::{PointsPolicy, PurchaseContext, RatePolicy, RedemptionRate};
use tally_core::validation::{
    validate_customer_name, validate_new_product, validate_non_negative, validate_points,
    validate_refund_request, validate_sale_request, validate_totals,
};
use tally_core::{
    CoreError, Customer, InventoryRecord, LoyaltyEvent, LoyaltyEventType, LoyaltyRedemption,
    Money, NewProduct, Product, Redemption, RedemptionResult, ReferenceType, RefundRequest,
    SaleRequest, Transaction, TransactionItem, ValidationError,
};
use tally_db::repository::{customer, loyalty, product, transaction};
use tally_db::{Database, DbError, SortOrder, UnitOfWork};

const INVOICE_UNIQUE: &str = "transactions.invoice_number";
const REDEMPTION_UNIQUE: &str = "transactions.redemption_event_id";
const SKU_UNIQUE: &str = "products.sku";

/// Commits on success, rolls back on failure.
async fn finish<T>(uow: UnitOfWork, result: EngineResult<T>) -> EngineResult<T> {
    match result {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(err) => {
            uow.rollback().await;
            Err(err)
        }
    }
}

/// Maps unique violations on the transaction row to domain errors.
fn sale_insert_error(err: DbError, sale: &Transaction) -> EngineError {
    if err.is_unique_violation_on(INVOICE_UNIQUE) {
        return CoreError::DuplicateInvoiceNumber(sale.invoice_number.clone()).into();
    }
    if err.is_unique_violation_on(REDEMPTION_UNIQUE) {
        return CoreError::InvalidRedemption {
            event_id: sale.redemption_event_id.clone().unwrap_or_default(),
            reason: "already applied to another sale".to_string(),
        }
        .into();
    }
    err.into()
}

/// Money side of a sale's loyalty redemption.
struct AppliedRedemption {
    discount: Money,
    points: i64,
    event_id: Option<String>,
}

impl AppliedRedemption {
    fn none() -> Self {
        AppliedRedemption {
            discount: Money::zero(),
            points: 0,
            event_id: None,
        }
    }
}

/// Sales, refunds, deletions and the registry writes around them.
#[derive(Debug, Clone)]
pub struct TransactionEngine {
    db: Database,
    config: EngineConfig,
    costing: FifoCostingEngine,
    loyalty: LoyaltyLedger,
}

impl TransactionEngine {
    /// Engine with the configured [`RatePolicy`].
    pub fn new(db: Database, config: EngineConfig) -> Self {
        let policy = Arc::new(RatePolicy::new(config.loyalty.clone()));
        Self::with_policy(db, config, policy)
    }

    pub fn with_policy(db: Database, config: EngineConfig, policy: Arc<dyn PointsPolicy>) -> Self {
        let rate = RedemptionRate::from_config(&config.loyalty);
        TransactionEngine {
            db,
            config,
            costing: FifoCostingEngine::new(),
            loyalty: LoyaltyLedger::new(policy, rate),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn loyalty(&self) -> &LoyaltyLedger {
        &self.loyalty
    }

    async fn begin(&self) -> EngineResult<UnitOfWork> {
        Ok(self.db.begin(self.config.busy_retries).await?)
    }

    // =========================================================================
    // Sales
    // =========================================================================

    /// Records a sale: stock, cost, loyalty and the transaction itself.
    pub async fn create_sale(
        &self,
        request: SaleRequest,
        performed_by: &str,
    ) -> EngineResult<Transaction> {
        validate_sale_request(&request)?;

        let transaction_id = Uuid::new_v4().to_string();
        let invoice_number = match &request.invoice_number {
            Some(invoice) => invoice.trim().to_string(),
            None => self.next_invoice_number(Utc::now()),
        };

        let mut uow = self.begin().await?;
        let result = self
            .create_sale_in(
                uow.conn()?,
                &request,
                &transaction_id,
                &invoice_number,
                performed_by,
            )
            .await;
        let sale = finish(uow, result).await?;

        info!(
            transaction_id = %sale.id,
            invoice = %sale.invoice_number,
            total = sale.total_cents,
            lines = sale.items.len(),
            points_awarded = sale.loyalty_points_awarded,
            points_redeemed = sale.loyalty_points_redeemed,
            "Sale recorded"
        );
        Ok(sale)
    }

    async fn create_sale_in(
        &self,
        conn: &mut SqliteConnection,
        request: &SaleRequest,
        transaction_id: &str,
        invoice_number: &str,
        performed_by: &str,
    ) -> EngineResult<Transaction> {
        let now = Utc::now();
        let movement = Movement {
            reference_type: ReferenceType::Transaction,
            reference_id: transaction_id,
            performed_by,
            at: now,
        };

        let buyer = match &request.customer_id {
            Some(id) => Some(
                customer::get(&mut *conn, id)
                    .await?
                    .ok_or_else(|| CoreError::CustomerNotFound(id.clone()))?,
            ),
            None => None,
        };

        let mut items = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let stock = product::get(&mut *conn, &line.product_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;

            let plan = self
                .costing
                .consume(&mut *conn, &stock, line.quantity, movement)
                .await?;

            let subtotal = Money::from_cents(line.unit_price_cents).multiply_quantity(line.quantity);
            items.push(TransactionItem {
                id: Uuid::new_v4().to_string(),
                transaction_id: transaction_id.to_string(),
                product_id: stock.id,
                sku_snapshot: stock.sku,
                quantity: line.quantity,
                unit_price_cents: line.unit_price_cents,
                subtotal_cents: subtotal.cents(),
                unit_cost_cents: plan.unit_cost().cents(),
                cost_cents: plan.total_cost.cents(),
                refunded_quantity: 0,
            });
        }

        let subtotal: Money = items.iter().map(TransactionItem::subtotal).sum();
        let discount = Money::from_cents(request.discount_cents);

        let redemption = match (&request.loyalty_redemption, &buyer) {
            (None, _) => AppliedRedemption::none(),
            (Some(_), None) => {
                return Err(ValidationError::Required {
                    field: "customerId".to_string(),
                }
                .into())
            }
            (Some(LoyaltyRedemption::Inline { amount_cents }), Some(buyer)) => {
                let amount = Money::from_cents(*amount_cents);
                validate_totals(subtotal.cents(), discount.cents(), amount.cents())?;

                let points = self.loyalty.rate().points_for_value(amount);
                let event = self
                    .loyalty
                    .redeem(
                        &mut *conn,
                        PointsEntry {
                            customer_id: &buyer.id,
                            points,
                            event_type: LoyaltyEventType::Redeem,
                            reason: format!("Redeemed on invoice {invoice_number}"),
                            reference_type: ReferenceType::Transaction,
                            reference_id: transaction_id,
                            monetary_value: amount,
                            performed_by,
                            at: now,
                        },
                    )
                    .await?;

                AppliedRedemption {
                    discount: amount,
                    points,
                    event_id: Some(event.id),
                }
            }
            (Some(LoyaltyRedemption::Prepaid { event_id }), Some(buyer)) => {
                let event = self.claim_redemption(&mut *conn, event_id, buyer).await?;
                let amount = Money::from_cents(event.monetary_value_cents);
                validate_totals(subtotal.cents(), discount.cents(), amount.cents())?;

                AppliedRedemption {
                    discount: amount,
                    points: -event.points,
                    event_id: Some(event.id),
                }
            }
        };

        let total = subtotal - discount - redemption.discount;

        let mut points_awarded = 0;
        if let Some(buyer) = &buyer {
            let context = PurchaseContext {
                line_count: items.len(),
                unit_count: items.iter().map(|item| item.quantity).sum(),
                subtotal,
            };
            points_awarded = self
                .loyalty
                .calculate_points_for_purchase(total, buyer, &context);

            self.loyalty
                .award_points(
                    &mut *conn,
                    PointsEntry {
                        customer_id: &buyer.id,
                        points: points_awarded,
                        event_type: LoyaltyEventType::Earn,
                        reason: format!("Purchase {invoice_number}"),
                        reference_type: ReferenceType::Transaction,
                        reference_id: transaction_id,
                        monetary_value: total,
                        performed_by,
                        at: now,
                    },
                )
                .await?;

            customer::record_purchase(&mut *conn, &buyer.id, total.cents(), now).await?;
        }

        let sale = Transaction {
            id: transaction_id.to_string(),
            invoice_number: invoice_number.to_string(),
            items,
            customer_id: buyer.map(|c| c.id),
            subtotal_cents: subtotal.cents(),
            discount_cents: discount.cents(),
            loyalty_discount_cents: redemption.discount.cents(),
            loyalty_points_awarded: points_awarded,
            loyalty_points_redeemed: redemption.points,
            redemption_event_id: redemption.event_id,
            total_cents: total.cents(),
            refunded: false,
            refund_amount_cents: 0,
            refund_reason: None,
            refunded_at: None,
            performed_by: performed_by.to_string(),
            created_at: now,
        };

        transaction::insert(&mut *conn, &sale)
            .await
            .map_err(|err| sale_insert_error(err, &sale))?;

        Ok(sale)
    }

    /// Checks that a standalone redemption can pay for this sale.
    async fn claim_redemption(
        &self,
        conn: &mut SqliteConnection,
        event_id: &str,
        buyer: &Customer,
    ) -> EngineResult<LoyaltyEvent> {
        let invalid = |reason: String| -> EngineError {
            CoreError::InvalidRedemption {
                event_id: event_id.to_string(),
                reason,
            }
            .into()
        };

        let event = loyalty::get(&mut *conn, event_id)
            .await?
            .ok_or_else(|| invalid("no such redemption".to_string()))?;

        if event.customer_id != buyer.id {
            return Err(invalid("belongs to another customer".to_string()));
        }
        if event.event_type != LoyaltyEventType::Redeem
            || event.reference_type != ReferenceType::StandaloneRedemption
        {
            return Err(invalid("not a standalone redemption".to_string()));
        }
        if let Some(other) = transaction::redemption_claimed_by(&mut *conn, event_id).await? {
            return Err(invalid(format!("already applied to transaction {other}")));
        }

        Ok(event)
    }

    // =========================================================================
    // Refunds
    // =========================================================================

    /// Sends all (no items) or some units of a sale back to stock.
    ///
    /// A transaction takes one refund; a second fails `AlreadyRefunded`.
    pub async fn refund(
        &self,
        transaction_id: &str,
        request: RefundRequest,
        performed_by: &str,
    ) -> EngineResult<Transaction> {
        validate_refund_request(&request)?;

        let mut uow = self.begin().await?;
        let result = self
            .refund_in(uow.conn()?, transaction_id, &request, performed_by)
            .await;
        let refunded = finish(uow, result).await?;

        info!(
            transaction_id = %refunded.id,
            amount = refunded.refund_amount_cents,
            full = request.items.is_none(),
            "Refund recorded"
        );
        Ok(refunded)
    }

    async fn refund_in(
        &self,
        conn: &mut SqliteConnection,
        transaction_id: &str,
        request: &RefundRequest,
        performed_by: &str,
    ) -> EngineResult<Transaction> {
        let now = Utc::now();
        let sale = transaction::get(&mut *conn, transaction_id)
            .await?
            .ok_or_else(|| CoreError::TransactionNotFound(transaction_id.to_string()))?;

        if sale.refunded {
            return Err(CoreError::AlreadyRefunded(sale.id).into());
        }

        let lines: Vec<(&TransactionItem, i64)> = match &request.items {
            None => sale
                .items
                .iter()
                .filter(|item| item.refundable() > 0)
                .map(|item| (item, item.refundable()))
                .collect(),
            Some(lines) => lines
                .iter()
                .map(|line| {
                    let item = sale.line_for(&line.product_id).ok_or_else(|| {
                        CoreError::InvalidRefundQuantity {
                            product_id: line.product_id.clone(),
                            requested: line.quantity,
                            refundable: 0,
                        }
                    })?;
                    if line.quantity > item.refundable() {
                        return Err(CoreError::InvalidRefundQuantity {
                            product_id: line.product_id.clone(),
                            requested: line.quantity,
                            refundable: item.refundable(),
                        });
                    }
                    Ok((item, line.quantity))
                })
                .collect::<Result<_, CoreError>>()?,
        };

        let movement = Movement {
            reference_type: ReferenceType::Transaction,
            reference_id: &sale.id,
            performed_by,
            at: now,
        };

        let mut returned_value = Money::zero();
        for (item, quantity) in &lines {
            self.costing
                .return_units(
                    &mut *conn,
                    &item.product_id,
                    *quantity,
                    Money::from_cents(item.unit_cost_cents),
                    movement,
                )
                .await?;

            if !transaction::add_refunded_quantity(&mut *conn, &item.id, *quantity).await? {
                return Err(CoreError::InvalidRefundQuantity {
                    product_id: item.product_id.clone(),
                    requested: *quantity,
                    refundable: item.refundable(),
                }
                .into());
            }

            returned_value += item.subtotal().pro_rata(*quantity, item.quantity);
        }

        let full = request.items.is_none();
        let refund_amount = if full {
            sale.total()
        } else {
            returned_value.min(sale.total())
        };

        if let Some(customer_id) = &sale.customer_id {
            let reversal = if full || sale.total_cents == 0 {
                sale.loyalty_points_awarded
            } else {
                (sale.loyalty_points_awarded as i128 * refund_amount.cents() as i128
                    / sale.total_cents as i128) as i64
            };

            self.loyalty
                .reverse(
                    &mut *conn,
                    PointsEntry {
                        customer_id,
                        points: -reversal,
                        event_type: LoyaltyEventType::RefundReversal,
                        reason: format!("Refund of {}", sale.invoice_number),
                        reference_type: ReferenceType::Transaction,
                        reference_id: &sale.id,
                        monetary_value: refund_amount,
                        performed_by,
                        at: now,
                    },
                )
                .await?;

            customer::reverse_purchase(&mut *conn, customer_id, refund_amount.cents(), 0).await?;
        }

        if !transaction::mark_refunded(
            &mut *conn,
            &sale.id,
            refund_amount.cents(),
            request.reason.trim(),
            now,
        )
        .await?
        {
            return Err(CoreError::AlreadyRefunded(sale.id.clone()).into());
        }

        let refunded = transaction::get(&mut *conn, &sale.id)
            .await?
            .ok_or_else(|| CoreError::TransactionNotFound(sale.id.clone()))?;
        Ok(refunded)
    }

    // =========================================================================
    // Deletion
    // =========================================================================

    /// Undoes a sale as if it never happened, then removes it.
    ///
    /// Refunded sales keep their history and cannot be deleted. Inline
    /// redeemed points are restored before the earned points are taken back;
    /// a prepaid redemption keeps its deduction and is free to be claimed by
    /// a later sale.
    pub async fn delete_transaction(
        &self,
        transaction_id: &str,
        performed_by: &str,
    ) -> EngineResult<()> {
        let mut uow = self.begin().await?;
        let result = self
            .delete_in(uow.conn()?, transaction_id, performed_by)
            .await;
        finish(uow, result).await?;

        info!(transaction_id = %transaction_id, performed_by = %performed_by, "Transaction deleted");
        Ok(())
    }

    async fn delete_in(
        &self,
        conn: &mut SqliteConnection,
        transaction_id: &str,
        performed_by: &str,
    ) -> EngineResult<()> {
        let now = Utc::now();
        let sale = transaction::get(&mut *conn, transaction_id)
            .await?
            .ok_or_else(|| CoreError::TransactionNotFound(transaction_id.to_string()))?;

        if sale.refunded {
            return Err(CoreError::CannotDeleteRefunded(sale.id).into());
        }

        let movement = Movement {
            reference_type: ReferenceType::TransactionDeletion,
            reference_id: &sale.id,
            performed_by,
            at: now,
        };

        for item in &sale.items {
            let quantity = item.refundable();
            if quantity > 0 {
                self.costing
                    .return_units(
                        &mut *conn,
                        &item.product_id,
                        quantity,
                        Money::from_cents(item.unit_cost_cents),
                        movement,
                    )
                    .await?;
            }
        }

        if let Some(customer_id) = &sale.customer_id {
            let entry = |points: i64, reason: String, value: Money| PointsEntry {
                customer_id,
                points,
                event_type: LoyaltyEventType::RefundReversal,
                reason,
                reference_type: ReferenceType::TransactionDeletion,
                reference_id: &sale.id,
                monetary_value: value,
                performed_by,
                at: now,
            };

            // A prepaid redemption stays deducted and can be claimed again once
            // this sale is gone; only an inline one is handed back.
            let prepaid = match &sale.redemption_event_id {
                Some(event_id) => loyalty::get(&mut *conn, event_id)
                    .await?
                    .is_some_and(|event| event.reference_type == ReferenceType::StandaloneRedemption),
                None => false,
            };
            if !prepaid {
                self.loyalty
                    .reverse(
                        &mut *conn,
                        entry(
                            sale.loyalty_points_redeemed,
                            format!("Redemption restored from deleted {}", sale.invoice_number),
                            Money::from_cents(sale.loyalty_discount_cents),
                        ),
                    )
                    .await?;
            }
            self.loyalty
                .reverse(
                    &mut *conn,
                    entry(
                        -sale.loyalty_points_awarded,
                        format!("Deleted {}", sale.invoice_number),
                        sale.total(),
                    ),
                )
                .await?;

            customer::reverse_purchase(&mut *conn, customer_id, sale.total_cents, 1).await?;
        }

        if !transaction::delete(&mut *conn, &sale.id).await? {
            return Err(CoreError::TransactionNotFound(sale.id.clone()).into());
        }

        Ok(())
    }

    // =========================================================================
    // Stock and Registry
    // =========================================================================

    /// Books a goods receipt as a new purchase lot.
    pub async fn receive_stock(
        &self,
        product_id: &str,
        quantity: i64,
        unit_cost_cents: i64,
        reference: &str,
        performed_by: &str,
    ) -> EngineResult<InventoryRecord> {
        if quantity <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            }
            .into());
        }
        validate_non_negative("unitCostCents", unit_cost_cents)?;
        if reference.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "reference".to_string(),
            }
            .into());
        }

        let mut uow = self.begin().await?;
        let result = self
            .receive_in(
                uow.conn()?,
                product_id,
                quantity,
                Money::from_cents(unit_cost_cents),
                Movement::new(ReferenceType::PurchaseOrder, reference.trim(), performed_by),
            )
            .await;
        let lot = finish(uow, result).await?;

        info!(product_id = %product_id, lot_id = %lot.id, quantity, unit_cost = unit_cost_cents, "Stock received");
        Ok(lot)
    }

    async fn receive_in(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
        quantity: i64,
        unit_cost: Money,
        movement: Movement<'_>,
    ) -> EngineResult<InventoryRecord> {
        if product::get(&mut *conn, product_id).await?.is_none() {
            return Err(CoreError::ProductNotFound(product_id.to_string()).into());
        }
        self.costing
            .receive(conn, product_id, quantity, unit_cost, movement)
            .await
    }

    /// Registers a product. Opening stock is untracked (legacy) stock.
    pub async fn create_product(&self, new: NewProduct) -> EngineResult<Product> {
        validate_new_product(&new)?;

        let now = Utc::now();
        let created = Product {
            id: product::generate_product_id(),
            sku: new.sku.trim().to_string(),
            name: new.name.trim().to_string(),
            quantity: new.opening_quantity,
            cost_cents: new.cost_cents,
            reorder_level: new.reorder_level,
            created_at: now,
            updated_at: now,
        };

        let mut uow = self.begin().await?;
        let result = match uow.conn() {
            Ok(conn) => product::insert(conn, &created).await.map_err(|err| {
                if err.is_unique_violation_on(SKU_UNIQUE) {
                    ValidationError::Duplicate {
                        field: "sku".to_string(),
                        value: created.sku.clone(),
                    }
                    .into()
                } else {
                    EngineError::from(err)
                }
            }),
            Err(err) => Err(err.into()),
        };
        finish(uow, result).await?;

        info!(product_id = %created.id, sku = %created.sku, "Product created");
        Ok(created)
    }

    pub async fn create_customer(&self, name: &str) -> EngineResult<Customer> {
        validate_customer_name(name)?;

        let created = Customer {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            loyalty_points: 0,
            total_spent_cents: 0,
            purchase_count: 0,
            last_purchase: None,
            created_at: Utc::now(),
        };

        let mut uow = self.begin().await?;
        let result = match uow.conn() {
            Ok(conn) => customer::insert(conn, &created).await.map_err(EngineError::from),
            Err(err) => Err(err.into()),
        };
        finish(uow, result).await?;

        debug!(customer_id = %created.id, "Customer created");
        Ok(created)
    }

    // =========================================================================
    // Standalone Redemption
    // =========================================================================

    /// Deducts points now, to be applied to a later sale with
    /// [`LoyaltyRedemption::Prepaid`].
    pub async fn redeem_loyalty_points(
        &self,
        customer_id: &str,
        points: i64,
        performed_by: &str,
    ) -> EngineResult<RedemptionResult> {
        validate_points(points)?;

        let mut uow = self.begin().await?;
        let result = self
            .redeem_in(uow.conn()?, customer_id, points, performed_by)
            .await;
        let redeemed = finish(uow, result).await?;

        info!(
            customer_id = %customer_id,
            event_id = %redeemed.redemption.event_id,
            points,
            value = redeemed.redemption.value_cents,
            "Points redeemed"
        );
        Ok(redeemed)
    }

    async fn redeem_in(
        &self,
        conn: &mut SqliteConnection,
        customer_id: &str,
        points: i64,
        performed_by: &str,
    ) -> EngineResult<RedemptionResult> {
        if customer::get(&mut *conn, customer_id).await?.is_none() {
            return Err(CoreError::CustomerNotFound(customer_id.to_string()).into());
        }

        let value = self.loyalty.rate().value_of_points(points);
        let event = self
            .loyalty
            .redeem(
                &mut *conn,
                PointsEntry {
                    customer_id,
                    points,
                    event_type: LoyaltyEventType::Redeem,
                    reason: "Standalone redemption".to_string(),
                    reference_type: ReferenceType::StandaloneRedemption,
                    reference_id: "",
                    monetary_value: value,
                    performed_by,
                    at: Utc::now(),
                },
            )
            .await?;

        let updated = customer::get(&mut *conn, customer_id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(customer_id.to_string()))?;

        Ok(RedemptionResult {
            customer: updated,
            redemption: Redemption {
                event_id: event.id,
                points,
                value_cents: value.cents(),
            },
        })
    }

    // =========================================================================
    // Readers
    // =========================================================================

    pub async fn transaction(&self, id: &str) -> EngineResult<Transaction> {
        self.db
            .transactions()
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::TransactionNotFound(id.to_string()).into())
    }

    pub async fn transaction_by_invoice(&self, invoice_number: &str) -> EngineResult<Transaction> {
        self.db
            .transactions()
            .get_by_invoice(invoice_number)
            .await?
            .ok_or_else(|| CoreError::TransactionNotFound(invoice_number.to_string()).into())
    }

    /// Newest first.
    pub async fn recent_transactions(&self, limit: u32) -> EngineResult<Vec<Transaction>> {
        Ok(self.db.transactions().recent(limit).await?)
    }

    pub async fn product(&self, id: &str) -> EngineResult<Product> {
        self.db
            .products()
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()).into())
    }

    pub async fn product_history(
        &self,
        product_id: &str,
        order: SortOrder,
        limit: u32,
    ) -> EngineResult<Vec<InventoryRecord>> {
        Ok(self.db.ledger().history(product_id, order, limit).await?)
    }

    /// Purchase lots with units left, oldest first.
    pub async fn open_lots(&self, product_id: &str) -> EngineResult<Vec<InventoryRecord>> {
        Ok(self.db.ledger().open_lots(product_id).await?)
    }

    /// Catalog for the till's product picker, by name.
    pub async fn products(&self, limit: u32) -> EngineResult<Vec<Product>> {
        Ok(self.db.products().list(limit).await?)
    }

    pub async fn products_needing_reorder(&self) -> EngineResult<Vec<Product>> {
        Ok(self.db.products().needing_reorder().await?)
    }

    pub async fn customer(&self, id: &str) -> EngineResult<Customer> {
        self.db
            .customers()
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(id.to_string()).into())
    }

    /// Customers by name.
    pub async fn customers(&self, limit: u32) -> EngineResult<Vec<Customer>> {
        Ok(self.db.customers().list(limit).await?)
    }

    pub async fn customer_loyalty_history(
        &self,
        customer_id: &str,
        order: SortOrder,
        limit: u32,
    ) -> EngineResult<Vec<LoyaltyEvent>> {
        Ok(self.db.loyalty().history(customer_id, order, limit).await?)
    }

    /// `<prefix>-YYYYMMDD-<8 hex>`.
    pub fn next_invoice_number(&self, at: DateTime<Utc>) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!(
            "{}-{}-{}",
            self.config.invoice_prefix,
            at.format("%Y%m%d"),
            suffix[..8].to_uppercase()
        )
    }
}
