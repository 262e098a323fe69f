//! # Persistence Errors
//!
//! Error types for the persistence layer, wrapping sqlx errors and the
//! conditions the account store reports back to the engine.

use rust_decimal::Decimal;
use thiserror::Error;

/// Persistence layer errors
#[derive(Debug, Error)]
pub enum PersistenceError {
    // === Database errors ===
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Record already exists: {entity} with {field} {value}")]
    AlreadyExists {
        entity: String,
        field: String,
        value: String,
    },

    // === Account store errors ===
    #[error("Insufficient funds on account {user_id}: required {required}, available {available}")]
    InsufficientFunds {
        user_id: i64,
        required: Decimal,
        available: Decimal,
    },

    #[error("Concurrent modification of account {0}")]
    Conflict(i64),

    // === Conversion errors ===
    #[error("Invalid decimal value: {0}")]
    InvalidDecimal(String),

    #[error("Invalid enum value: {field} = {value}")]
    InvalidEnumValue { field: String, value: String },
}

/// Result type alias for PersistenceError
pub type PersistenceResult<T> = Result<T, PersistenceError>;

impl PersistenceError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn already_exists(entity: &str, field: &str, value: &str) -> Self {
        Self::AlreadyExists {
            entity: entity.to_string(),
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_insufficient_funds(&self) -> bool {
        matches!(self, Self::InsufficientFunds { .. })
    }
}
