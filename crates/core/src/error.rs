//! # Error Module
//!
//! Domain errors raised while constructing core values.

use thiserror::Error;

/// Core domain errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid CPF: {0}")]
    InvalidCpf(String),

    #[error("Invalid account status: {0}")]
    InvalidStatus(String),

    #[error("Invalid piggy bank transaction type: {0}")]
    InvalidPiggyKind(String),
}

/// Result type alias with CoreError
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Whether the error was caused by a bad amount
    pub fn is_invalid_amount(&self) -> bool {
        matches!(self, CoreError::InvalidAmount(_))
    }
}
