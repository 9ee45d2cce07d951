//! # Request Payloads
//!
//! What the route layer hands to the engines. Caller identity is injected
//! by the route layer as `performed_by` and is never read from client input.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::Customer;

/// A line the customer is buying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleLine {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

/// How loyalty points pay for part of a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoyaltyRedemption {
    /// Redeem points worth `amount_cents` as part of this sale.
    Inline {
        #[serde(rename = "amountCents")]
        amount_cents: i64,
    },

    /// Apply a redemption already made through `redeem_loyalty_points`.
    Prepaid {
        #[serde(rename = "eventId")]
        event_id: String,
    },
}

/// Everything needed to record one sale in a single unit of work.
///
/// Draft-then-confirm flows assemble this client-side and submit it once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleRequest {
    pub items: Vec<SaleLine>,
    #[serde(default)]
    pub customer_id: Option<String>,
    /// Flat discount in cents.
    #[serde(default)]
    pub discount_cents: i64,
    #[serde(default)]
    pub loyalty_redemption: Option<LoyaltyRedemption>,
    /// Caller-chosen invoice number; generated when absent.
    #[serde(default)]
    pub invoice_number: Option<String>,
}

/// A line to send back to stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RefundLine {
    pub product_id: String,
    pub quantity: i64,
}

/// `items: None` refunds the whole transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RefundRequest {
    #[serde(default)]
    pub items: Option<Vec<RefundLine>>,
    pub reason: String,
}

impl RefundRequest {
    pub fn full(reason: impl Into<String>) -> Self {
        RefundRequest {
            items: None,
            reason: reason.into(),
        }
    }

    pub fn partial(items: Vec<RefundLine>, reason: impl Into<String>) -> Self {
        RefundRequest {
            items: Some(items),
            reason: reason.into(),
        }
    }
}

/// Points taken off a balance and what they are worth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Redemption {
    /// The `redeem` loyalty event; pass it back as [`LoyaltyRedemption::Prepaid`].
    pub event_id: String,
    pub points: i64,
    pub value_cents: i64,
}

/// Response of a standalone redemption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionResult {
    pub customer: Customer,
    pub redemption: Redemption,
}

/// Input for registering a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub cost_cents: i64,
    #[serde(default)]
    pub reorder_level: i64,
    /// Stock that existed before lot tracking; becomes legacy quantity.
    #[serde(default)]
    pub opening_quantity: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sale_request_from_json() {
        let json = r#"{
            "items": [{"productId": "p-1", "quantity": 2, "unitPriceCents": 250}],
            "customerId": "c-1",
            "loyaltyRedemption": {"kind": "inline", "amountCents": 100}
        }"#;
        let req: SaleRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.items.len(), 1);
        assert_eq!(req.discount_cents, 0);
        assert_eq!(
            req.loyalty_redemption,
            Some(LoyaltyRedemption::Inline { amount_cents: 100 })
        );
        assert!(req.invoice_number.is_none());
    }

    #[test]
    fn test_refund_request_without_items_is_full() {
        let req: RefundRequest = serde_json::from_str(r#"{"reason": "damaged"}"#).unwrap();
        assert_eq!(req, RefundRequest::full("damaged"));
    }
}
