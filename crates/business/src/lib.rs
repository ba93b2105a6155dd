//! # GrossBook Business
//!
//! Ledger orchestrator: kết hợp `LedgerStore` và `Converter` thành các request
//! deposit, withdraw, transfer, balance, history.

pub mod error;
pub mod ledger;

pub use error::{ErrorKind, LedgerError, LedgerResult};
pub use ledger::GrossBook;
