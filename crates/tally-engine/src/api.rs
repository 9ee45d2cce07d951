//! # API Error Type
//!
//! The plain serializable error a route layer hands back to its client.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  engine.create_sale(request, "cashier-7")                               │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  EngineError ──┬── Core(InsufficientInventory) ──► INSUFFICIENT_...    │
//! │                ├── Core(LedgerInconsistency)   ──► INTERNAL (logged)   │
//! │                └── Db(QueryFailed)             ──► DATABASE_ERROR      │
//! │                                                                         │
//! │  { "code": "INSUFFICIENT_INVENTORY",                                    │
//! │    "message": "Only 3 units of COKE-330 available, 5 requested" }       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Detail of internal failures stays in the log.

use serde::Serialize;
use tally_core::config::ConfigError;
use tally_core::CoreError;
use tally_db::DbError;

use crate::error::EngineError;

/// Error returned across the route boundary.
///
/// ```json
/// {
///   "code": "ALREADY_REFUNDED",
///   "message": "Transaction 5f0c… has already been refunded"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Product, transaction, customer or record missing (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    InsufficientInventory,

    InsufficientLoyaltyPoints,

    DuplicateInvoiceNumber,

    AlreadyRefunded,

    InvalidRefundQuantity,

    CannotDeleteRefunded,

    /// Prepaid redemption unknown, foreign or already used
    InvalidRedemption,

    /// Write lock could not be taken in time; safe to retry (503)
    Busy,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal error (500)
    Internal,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{resource} not found: {id}"))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field } => {
                ApiError::validation(format!("{field} already exists"))
            }
            DbError::Busy => ApiError::new(
                ErrorCode::Busy,
                "The ledger is busy, please try again",
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::validation("Invalid reference")
            }
            DbError::CheckViolation { message } => {
                tracing::error!("Check constraint violation: {}", message);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InsufficientInventory {
                sku,
                available,
                requested,
            } => ApiError::new(
                ErrorCode::InsufficientInventory,
                format!("Only {available} units of {sku} available, {requested} requested"),
            ),
            CoreError::InsufficientLoyaltyPoints {
                available,
                requested,
                ..
            } => ApiError::new(
                ErrorCode::InsufficientLoyaltyPoints,
                format!("Only {available} loyalty points available, {requested} requested"),
            ),
            CoreError::DuplicateInvoiceNumber(invoice) => ApiError::new(
                ErrorCode::DuplicateInvoiceNumber,
                format!("Invoice number {invoice} is already in use"),
            ),
            e @ CoreError::AlreadyRefunded(_) => {
                ApiError::new(ErrorCode::AlreadyRefunded, e.to_string())
            }
            e @ CoreError::InvalidRefundQuantity { .. } => {
                ApiError::new(ErrorCode::InvalidRefundQuantity, e.to_string())
            }
            e @ CoreError::CannotDeleteRefunded(_) => {
                ApiError::new(ErrorCode::CannotDeleteRefunded, e.to_string())
            }
            e @ CoreError::InvalidRedemption { .. } => {
                ApiError::new(ErrorCode::InvalidRedemption, e.to_string())
            }
            CoreError::ProductNotFound(id) => ApiError::not_found("Product", &id),
            CoreError::TransactionNotFound(id) => ApiError::not_found("Transaction", &id),
            CoreError::CustomerNotFound(id) => ApiError::not_found("Customer", &id),
            CoreError::LedgerInconsistency { product_id, detail } => {
                tracing::error!(product_id = %product_id, detail = %detail, "Ledger inconsistency");
                ApiError::internal("Inventory records are inconsistent; the operation was not applied")
            }
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        tracing::error!("Configuration error: {}", err);
        ApiError::internal("Server misconfigured")
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Core(e) => e.into(),
            EngineError::Db(e) => e.into(),
            EngineError::Config(e) => e.into(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::ValidationError;

    #[test]
    fn test_serializes_screaming_code() {
        let err = ApiError::from(CoreError::AlreadyRefunded("t-1".to_string()));
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "ALREADY_REFUNDED");
        assert_eq!(json["message"], "Transaction t-1 has already been refunded");
    }

    #[test]
    fn test_inventory_message_is_actionable() {
        let err = ApiError::from(CoreError::InsufficientInventory {
            sku: "COKE-330".to_string(),
            available: 3,
            requested: 5,
        });
        assert_eq!(err.code, ErrorCode::InsufficientInventory);
        assert_eq!(err.message, "Only 3 units of COKE-330 available, 5 requested");
    }

    #[test]
    fn test_ledger_detail_stays_server_side() {
        let err = ApiError::from(EngineError::from(CoreError::ledger(
            "p-1",
            "lot L1 has fewer than 4 units left",
        )));
        assert_eq!(err.code, ErrorCode::Internal);
        assert!(!err.message.contains("L1"));
        assert!(!err.message.contains("p-1"));
    }

    #[test]
    fn test_query_failure_is_generic() {
        let err = ApiError::from(DbError::QueryFailed("near \"SELEC\": syntax error".to_string()));
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.message, "Database operation failed");
    }

    #[test]
    fn test_validation_passes_message_through() {
        let err = ApiError::from(EngineError::from(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }));
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.message, "quantity must be positive");
        assert_eq!(err.to_string(), "[ValidationError] quantity must be positive");
    }
}
