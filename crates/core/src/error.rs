//! # Error Module
//!
//! Các lỗi nghiệp vụ cốt lõi: số học trên số dư và tính hợp lệ của Operation.

use rust_decimal::Decimal;
use thiserror::Error;

/// Core domain errors.
///
/// Deterministic given the inputs, so callers can match on them directly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    // === Money errors ===
    #[error("can't operate with zero values")]
    ZeroAmount,

    #[error("doesn't work with negative amounts")]
    NegativeAmount,

    #[error("can't hold so big amount of money")]
    Overflow,

    #[error("insufficient funds: need {needed}, available {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    // === Operation errors ===
    #[error("incorrect operation: {0}")]
    IncorrectOperationParams(String),

    #[error("{0} isn't a transfer operation")]
    NonTransferOperation(String),
}

/// Result type alias với CoreError
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn incorrect(reason: impl Into<String>) -> Self {
        Self::IncorrectOperationParams(reason.into())
    }

    pub fn is_insufficient_funds(&self) -> bool {
        matches!(self, CoreError::InsufficientFunds { .. })
    }
}
