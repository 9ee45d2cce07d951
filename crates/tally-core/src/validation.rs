//! # Validation Module
//!
//! Input checks run before a unit of work is opened.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Route layer                                                   │
//! │  └── Deserialization (types, required fields)                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── Shape checks (non-empty, positive, lengths)                       │
//! │  └── Totals (discounts never exceed the subtotal)                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Engine, inside the unit of work                              │
//! │  └── Stock, balances, refund state (need current data)                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: SQLite                                                        │
//! │  └── UNIQUE (sku, invoice_number), CHECK (quantity >= 0)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::request::{NewProduct, RefundRequest, SaleRequest};
use crate::{
    MAX_LINE_QUANTITY, MAX_REASON_LENGTH, MAX_REDEMPTION_POINTS, MAX_TRANSACTION_LINES,
    MAX_UNIT_PRICE_CENTS,
};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, numbers, hyphens and underscores only
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_sku;
///
/// assert!(validate_sku("COKE-330").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("COKE 330").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a caller-supplied invoice number.
pub fn validate_invoice_number(invoice: &str) -> ValidationResult<()> {
    let invoice = invoice.trim();

    if invoice.is_empty() {
        return Err(ValidationError::Required {
            field: "invoiceNumber".to_string(),
        });
    }

    if invoice.len() > 64 {
        return Err(ValidationError::TooLong {
            field: "invoiceNumber".to_string(),
            max: 64,
        });
    }

    Ok(())
}

pub fn validate_reason(reason: &str) -> ValidationResult<()> {
    if reason.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "reason".to_string(),
        });
    }

    if reason.len() > MAX_REASON_LENGTH {
        return Err(ValidationError::TooLong {
            field: "reason".to_string(),
            max: MAX_REASON_LENGTH,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates an amount in cents that may be zero (free items, no discount).
pub fn validate_non_negative(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a unit price: zero for free items, capped at MAX_UNIT_PRICE_CENTS.
pub fn validate_unit_price(cents: i64) -> ValidationResult<()> {
    validate_non_negative("unitPriceCents", cents)?;
    if cents > MAX_UNIT_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "unitPriceCents".to_string(),
            min: 0,
            max: MAX_UNIT_PRICE_CENTS,
        });
    }
    Ok(())
}

/// Validates a point count for a redemption.
pub fn validate_points(points: i64) -> ValidationResult<()> {
    if points <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "points".to_string(),
        });
    }
    if points > MAX_REDEMPTION_POINTS {
        return Err(ValidationError::OutOfRange {
            field: "points".to_string(),
            min: 1,
            max: MAX_REDEMPTION_POINTS,
        });
    }
    Ok(())
}

fn amount_out_of_range(field: &str) -> ValidationError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: i64::MAX,
    }
}

/// Checks that discounts leave a non-negative total.
pub fn validate_totals(
    subtotal_cents: i64,
    discount_cents: i64,
    loyalty_discount_cents: i64,
) -> ValidationResult<()> {
    let discounts = discount_cents
        .checked_add(loyalty_discount_cents)
        .ok_or_else(|| amount_out_of_range("discounts"))?;
    if discounts > subtotal_cents {
        return Err(ValidationError::ExceedsSubtotal {
            discounts,
            subtotal: subtotal_cents,
        });
    }
    Ok(())
}

// =============================================================================
// Request Validators
// =============================================================================

pub fn validate_new_product(product: &NewProduct) -> ValidationResult<()> {
    validate_sku(&product.sku)?;
    validate_product_name(&product.name)?;
    validate_non_negative("costCents", product.cost_cents)?;
    validate_non_negative("reorderLevel", product.reorder_level)?;
    validate_non_negative("openingQuantity", product.opening_quantity)?;
    Ok(())
}

/// Shape checks for a sale.
///
/// ## Rules
/// - 1..=MAX_TRANSACTION_LINES lines, each product at most once
/// - Positive quantities, non-negative prices and discount
/// - Inline redemption amounts positive
/// - Discounts within the subtotal
pub fn validate_sale_request(request: &SaleRequest) -> ValidationResult<()> {
    if request.items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if request.items.len() > MAX_TRANSACTION_LINES {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_TRANSACTION_LINES as i64,
        });
    }

    let mut seen = HashSet::new();
    let mut subtotal: i64 = 0;
    for line in &request.items {
        if line.product_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "productId".to_string(),
            });
        }
        if !seen.insert(line.product_id.as_str()) {
            return Err(ValidationError::Duplicate {
                field: "productId".to_string(),
                value: line.product_id.clone(),
            });
        }
        validate_quantity(line.quantity)?;
        validate_unit_price(line.unit_price_cents)?;
        subtotal = line
            .unit_price_cents
            .checked_mul(line.quantity)
            .and_then(|amount| subtotal.checked_add(amount))
            .ok_or_else(|| amount_out_of_range("subtotal"))?;
    }

    validate_non_negative("discountCents", request.discount_cents)?;

    if let Some(invoice) = &request.invoice_number {
        validate_invoice_number(invoice)?;
    }

    if let Some(crate::request::LoyaltyRedemption::Inline { amount_cents }) =
        &request.loyalty_redemption
    {
        if *amount_cents <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "loyaltyRedemption.amountCents".to_string(),
            });
        }
        validate_totals(subtotal, request.discount_cents, *amount_cents)?;
    } else {
        validate_totals(subtotal, request.discount_cents, 0)?;
    }

    if request.loyalty_redemption.is_some() && request.customer_id.is_none() {
        return Err(ValidationError::Required {
            field: "customerId".to_string(),
        });
    }

    Ok(())
}

/// Shape checks for a refund. Quantities against the sale are checked later.
pub fn validate_refund_request(request: &RefundRequest) -> ValidationResult<()> {
    validate_reason(&request.reason)?;

    if let Some(items) = &request.items {
        if items.is_empty() {
            return Err(ValidationError::Required {
                field: "items".to_string(),
            });
        }
        let mut seen = HashSet::new();
        for line in items {
            if !seen.insert(line.product_id.as_str()) {
                return Err(ValidationError::Duplicate {
                    field: "productId".to_string(),
                    value: line.product_id.clone(),
                });
            }
            validate_quantity(line.quantity)?;
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
