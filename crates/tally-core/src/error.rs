//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  tally-engine errors                                                   │
//! │  ├── EngineError      - CoreError | DbError                            │
//! │  └── ApiError         - What the route layer sees (serialized)         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → ApiError            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant aborts the surrounding unit of work. `LedgerInconsistency`
//! is the odd one out: it signals a data-integrity bug, not bad input, so
//! its detail never reaches the caller.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Selling more than is on hand.
    ///
    /// ## User Workflow
    /// ```text
    /// create_sale(SKU "COKE-330", qty 5)
    ///      │
    ///      ▼
    /// Inside unit of work: on hand = 3
    ///      │
    ///      ▼
    /// InsufficientInventory { sku: "COKE-330", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// UI shows: "Only 3 units of COKE-330 available"
    /// ```
    #[error("Insufficient inventory for {sku}: only {available} units available, {requested} requested")]
    InsufficientInventory {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// Redeeming more points than the customer holds.
    #[error("Insufficient loyalty points for customer {customer_id}: balance {available}, requested {requested}")]
    InsufficientLoyaltyPoints {
        customer_id: String,
        available: i64,
        requested: i64,
    },

    /// Invoice number already used by another transaction.
    #[error("Invoice number already exists: {0}")]
    DuplicateInvoiceNumber(String),

    /// Transaction was refunded before.
    #[error("Transaction {0} has already been refunded")]
    AlreadyRefunded(String),

    /// Refund line exceeds what the sale line can still return.
    #[error("Invalid refund quantity for product {product_id}: requested {requested}, refundable {refundable}")]
    InvalidRefundQuantity {
        product_id: String,
        requested: i64,
        refundable: i64,
    },

    /// Refunded transactions keep their history; the refund is the compensation.
    #[error("Transaction {0} has been refunded and cannot be deleted")]
    CannotDeleteRefunded(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Stored lots and on-hand quantity disagree.
    ///
    /// ## When This Occurs
    /// - Tracked lots + legacy quantity cannot cover a sale that passed the
    ///   on-hand check
    /// - A guarded lot/product decrement touched no row
    ///
    /// Never shown verbatim to the caller.
    #[error("Ledger inconsistency for product {product_id}: {detail}")]
    LedgerInconsistency { product_id: String, detail: String },

    /// A prepaid redemption cannot be applied to this sale.
    #[error("Loyalty redemption {event_id} cannot be applied: {reason}")]
    InvalidRedemption { event_id: String, reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Shorthand for a [`CoreError::LedgerInconsistency`].
    pub fn ledger(product_id: impl Into<String>, detail: impl Into<String>) -> Self {
        CoreError::LedgerInconsistency {
            product_id: product_id.into(),
            detail: detail.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any unit of work is opened.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid SKU characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value inside one request (e.g., same product twice in a refund).
    #[error("{field} '{value}' appears more than once")]
    Duplicate { field: String, value: String },

    /// Discounts larger than the sale itself.
    #[error("discounts ({discounts} cents) exceed subtotal ({subtotal} cents)")]
    ExceedsSubtotal { discounts: i64, subtotal: i64 },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_inventory_message_is_actionable() {
        let err = CoreError::InsufficientInventory {
            sku: "COKE-330".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient inventory for COKE-330: only 3 units available, 5 requested"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "sku".to_string(),
        };
        assert_eq!(err.to_string(), "sku is required");

        let err = ValidationError::ExceedsSubtotal {
            discounts: 1200,
            subtotal: 1000,
        };
        assert_eq!(
            err.to_string(),
            "discounts (1200 cents) exceed subtotal (1000 cents)"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "items".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }

    #[test]
    fn test_ledger_shorthand() {
        let err = CoreError::ledger("p-1", "lots cover 3 of 5");
        assert!(matches!(err, CoreError::LedgerInconsistency { .. }));
        assert!(err.to_string().contains("p-1"));
    }
}
