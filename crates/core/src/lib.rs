//! # GrossBook Core
//!
//! Domain types cho ledger: User (số dư + bất biến), Operation (bản ghi giao dịch),
//! SortMode và LedgerEntry cho history.
//!
//! Crate này không có I/O. Persistence và conversion nằm ở các crate khác.

pub mod error;
pub mod operation;
pub mod user;

pub use error::{CoreError, CoreResult};
pub use operation::{LedgerEntry, Operation, OperationKind, SortMode};
pub use user::{User, UserId, EPSILON};
