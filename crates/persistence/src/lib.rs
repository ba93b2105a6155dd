//! # GrossBook Persistence
//!
//! Persistence layer cho GrossBook: contract `LedgerStore` mà ledger engine
//! dùng, cùng hai implementation.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    dyn LedgerStore                       │
//! │  ┌────────────────────────┐  ┌────────────────────────┐  │
//! │  │  SqliteLedgerStore     │  │  MemoryLedgerStore     │  │
//! │  │  (sqlx, migrations)    │  │  (tests, offline runs) │  │
//! │  └────────────────────────┘  └────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use grossbook_persistence::{LedgerStore, SqliteLedgerStore};
//!
//! let store = SqliteLedgerStore::open("sqlite:data/grossbook.db").await?;
//! store.create_user(42).await?;
//! let user = store.load_user(42).await?;
//! ```

pub mod error;
pub mod memory;
pub mod sqlite;
pub mod store;

pub use error::{PersistenceError, PersistenceResult};
pub use memory::MemoryLedgerStore;
pub use sqlite::{init_database, SqliteLedgerStore, StoreStats};
pub use store::LedgerStore;
