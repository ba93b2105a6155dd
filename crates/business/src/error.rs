//! Business layer errors
//!
//! Lỗi arithmetic và model từ core đi qua nguyên vẹn; `kind()` cho caller
//! phân biệt từng loại mà không phải so sánh string.

use grossbook_core::CoreError;
use grossbook_exchange::ConversionError;
use grossbook_persistence::PersistenceError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Ledger operation errors
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type alias for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Flat classification of every failure a ledger request can end with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ZeroAmount,
    NegativeAmount,
    Overflow,
    InsufficientFunds,
    IncorrectOperationParams,
    NonTransferOperation,
    UserNotFound,
    NotConnected,
    ConversionFailed,
    InvalidRequest,
    Conflict,
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ZeroAmount => "zero_amount",
            ErrorKind::NegativeAmount => "negative_amount",
            ErrorKind::Overflow => "overflow",
            ErrorKind::InsufficientFunds => "insufficient_funds",
            ErrorKind::IncorrectOperationParams => "incorrect_operation_params",
            ErrorKind::NonTransferOperation => "non_transfer_operation",
            ErrorKind::UserNotFound => "user_not_found",
            ErrorKind::NotConnected => "not_connected",
            ErrorKind::ConversionFailed => "conversion_failed",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Storage => "storage",
        }
    }

    fn of_core(err: &CoreError) -> Self {
        match err {
            CoreError::ZeroAmount => ErrorKind::ZeroAmount,
            CoreError::NegativeAmount => ErrorKind::NegativeAmount,
            CoreError::Overflow => ErrorKind::Overflow,
            CoreError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            CoreError::IncorrectOperationParams(_) => ErrorKind::IncorrectOperationParams,
            CoreError::NonTransferOperation(_) => ErrorKind::NonTransferOperation,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LedgerError {
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest(reason.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Core(e) => ErrorKind::of_core(e),
            LedgerError::Persistence(e) => match e {
                PersistenceError::UserNotFound(_) => ErrorKind::UserNotFound,
                PersistenceError::NotConnected => ErrorKind::NotConnected,
                PersistenceError::InvalidLimit(_) => ErrorKind::InvalidRequest,
                PersistenceError::Conflict(_) => ErrorKind::Conflict,
                PersistenceError::Rejected(core) => ErrorKind::of_core(core),
                _ => ErrorKind::Storage,
            },
            LedgerError::Conversion(_) => ErrorKind::ConversionFailed,
            LedgerError::InvalidRequest(_) => ErrorKind::InvalidRequest,
        }
    }
}
