//! SQLite persistence module
//!
//! `SqliteLedgerStore` trên sqlx + SQLite, schema qua migrations.

pub mod schema;
pub mod store;

pub use schema::{OperationRow, UserRow};
pub use store::{init_database, run_migrations, SqliteLedgerStore, StoreStats};
