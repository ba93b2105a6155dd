//! In-memory LedgerStore
//!
//! Toàn bộ state nằm sau một Mutex; mỗi commit giữ lock từ lúc kiểm tra đến
//! lúc ghi xong nên luôn all-or-nothing.

use crate::error::{PersistenceError, PersistenceResult};
use crate::store::{check_limit, records, settle, LedgerStore};
use async_trait::async_trait;
use grossbook_core::{LedgerEntry, Operation, User, UserId};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct State {
    balances: HashMap<UserId, Decimal>,
    /// Append-only, oldest first
    operations: Vec<LedgerEntry>,
    closed: bool,
}

/// LedgerStore giữ mọi thứ trong bộ nhớ process.
#[derive(Default)]
pub struct MemoryLedgerStore {
    state: Mutex<State>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user with an existing balance
    pub fn with_user(self, id: UserId, balance: Decimal) -> Self {
        self.lock().balances.insert(id, balance);
        self
    }

    /// Số users và operations hiện có
    pub fn counts(&self) -> (usize, usize) {
        let state = self.lock();
        (state.balances.len(), state.operations.len())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open(&self) -> PersistenceResult<MutexGuard<'_, State>> {
        let state = self.lock();
        if state.closed {
            return Err(PersistenceError::NotConnected);
        }
        Ok(state)
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn load_user(&self, id: UserId) -> PersistenceResult<User> {
        let state = self.open()?;
        state
            .balances
            .get(&id)
            .map(|balance| User::with_balance(id, *balance))
            .ok_or(PersistenceError::UserNotFound(id))
    }

    async fn create_user(&self, id: UserId) -> PersistenceResult<()> {
        let mut state = self.open()?;
        state.balances.entry(id).or_insert(Decimal::ZERO);
        Ok(())
    }

    async fn commit_operation(&self, operation: &Operation) -> PersistenceResult<()> {
        let mut state = self.open()?;

        // check everything first, then write
        for (user, kind) in operation.sides()? {
            let stored = state
                .balances
                .get(&user.id)
                .map(|balance| User::with_balance(user.id, *balance))
                .ok_or(PersistenceError::UserNotFound(user.id))?;
            settle(&stored, user, kind, operation.amount)?;
        }
        let entries = records(operation)?;

        for user in operation.users() {
            state.balances.insert(user.id, user.balance);
        }
        state.operations.extend(entries);
        Ok(())
    }

    async fn list_operations(&self, id: UserId, limit: i64) -> PersistenceResult<Vec<LedgerEntry>> {
        check_limit(limit)?;
        let state = self.open()?;
        let mut entries: Vec<LedgerEntry> = state
            .operations
            .iter()
            .rev()
            .filter(|entry| entry.initiator_id == id)
            .cloned()
            .collect();
        // newest first; insertion order breaks timestamp ties
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(entries)
    }

    async fn shutdown(&self) {
        self.lock().closed = true;
    }
}
