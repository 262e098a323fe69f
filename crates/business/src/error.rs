//! Ledger errors
//!
//! Typed results returned across the engine boundary. The caller maps each
//! variant to its own transport-level response.

use points_core::{CoreError, UserId};
use points_persistence::PersistenceError;
use rust_decimal::Decimal;
use thiserror::Error;

/// Ledger operation errors
#[derive(Debug, Error)]
pub enum LedgerError {
    // === Validation errors ===
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Cannot transfer points to yourself")]
    SelfTransfer,

    #[error("Idempotency key {0} was already used for a different transfer")]
    IdempotencyConflict(String),

    // === Balance errors ===
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    // === Not found errors ===
    #[error("Recipient not found: {0}")]
    RecipientNotFound(String),

    #[error("Account not found: {0}")]
    AccountNotFound(UserId),

    #[error("Account already exists with {field} {value}")]
    AccountExists { field: String, value: String },

    // === Access errors ===
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // === Wrapped errors ===
    #[error("Persistence failure: {0}")]
    Persistence(PersistenceError),
}

/// Result type alias for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

impl LedgerError {
    pub fn insufficient_funds(required: Decimal, available: Decimal) -> Self {
        Self::InsufficientFunds {
            required,
            available,
        }
    }

    pub fn unauthorized(reason: &str) -> Self {
        Self::Unauthorized(reason.to_string())
    }

    /// Stable machine-readable code for the caller's response mapping
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InvalidAmount(_) => "invalid_amount",
            LedgerError::InvalidInput(_) => "invalid_input",
            LedgerError::SelfTransfer => "self_transfer",
            LedgerError::IdempotencyConflict(_) => "idempotency_conflict",
            LedgerError::InsufficientFunds { .. } => "insufficient_funds",
            LedgerError::RecipientNotFound(_) => "recipient_not_found",
            LedgerError::AccountNotFound(_) => "account_not_found",
            LedgerError::AccountExists { .. } => "account_exists",
            LedgerError::Unauthorized(_) => "unauthorized",
            LedgerError::Persistence(_) => "persistence_failure",
        }
    }

    pub fn is_insufficient_funds(&self) -> bool {
        matches!(self, LedgerError::InsufficientFunds { .. })
    }

    pub fn is_persistence_failure(&self) -> bool {
        matches!(self, LedgerError::Persistence(_))
    }
}

impl From<PersistenceError> for LedgerError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::InsufficientFunds {
                required,
                available,
                ..
            } => LedgerError::InsufficientFunds {
                required,
                available,
            },
            PersistenceError::AlreadyExists { field, value, .. } => {
                LedgerError::AccountExists { field, value }
            }
            other => LedgerError::Persistence(other),
        }
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        LedgerError::Persistence(PersistenceError::Database(err))
    }
}

impl From<CoreError> for LedgerError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidAmount(msg) => LedgerError::InvalidAmount(msg),
            other => LedgerError::InvalidInput(other.to_string()),
        }
    }
}
