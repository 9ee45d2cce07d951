//! # Engine Errors
//!
//! Everything a unit of work can fail with: a broken business rule from
//! tally-core or a database failure from tally-db.

use tally_core::config::ConfigError;
use tally_core::{CoreError, ValidationError};
use tally_db::DbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Core(CoreError::Validation(err))
    }
}

impl EngineError {
    /// The core error, if this is one.
    pub fn core(&self) -> Option<&CoreError> {
        match self {
            EngineError::Core(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_ledger_inconsistency(&self) -> bool {
        matches!(self, EngineError::Core(CoreError::LedgerInconsistency { .. }))
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_wraps_into_core() {
        let err: EngineError = ValidationError::Required {
            field: "reason".to_string(),
        }
        .into();
        assert!(matches!(err.core(), Some(CoreError::Validation(_))));
        assert_eq!(err.to_string(), "Validation error: reason is required");
    }

    #[test]
    fn test_ledger_flag() {
        let err: EngineError = CoreError::ledger("p-1", "lot L1 short").into();
        assert!(err.is_ledger_inconsistency());
        assert!(!EngineError::from(DbError::Busy).is_ledger_inconsistency());
    }
}
