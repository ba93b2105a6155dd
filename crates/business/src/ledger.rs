//! GrossBook - ledger orchestrator
//!
//! Mỗi request: load user → mutate bản copy trong memory → build operation →
//! commit một lần qua `LedgerStore`. Không có lock trong process và không retry;
//! store lo việc serialize các commit đụng cùng một user.

use crate::error::{LedgerError, LedgerResult};
use chrono::Utc;
use grossbook_core::{LedgerEntry, Operation, SortMode, User, UserId};
use grossbook_exchange::Converter;
use grossbook_persistence::LedgerStore;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct GrossBook {
    store: Arc<dyn LedgerStore>,
    converter: Arc<dyn Converter>,
    shut_down: AtomicBool,
}

impl GrossBook {
    pub fn new(store: Arc<dyn LedgerStore>, converter: Arc<dyn Converter>) -> Self {
        Self {
            store,
            converter,
            shut_down: AtomicBool::new(false),
        }
    }

    /// Deposit `amount` to `id`, creating the user on first deposit
    pub async fn deposit(&self, id: UserId, amount: Decimal) -> LedgerResult<Operation> {
        info!(user_id = id, %amount, "deposit processing...");
        finish("deposit", self.apply_deposit(id, amount).await)
    }

    /// Withdraw `amount`; khi có `currency` thì amount tính theo currency đó
    /// và được quy đổi sang settlement currency trước
    pub async fn withdraw(
        &self,
        id: UserId,
        amount: Decimal,
        currency: Option<&str>,
    ) -> LedgerResult<Operation> {
        info!(user_id = id, %amount, currency = currency.unwrap_or_default(), "withdraw processing...");
        finish("withdraw", self.apply_withdraw(id, amount, currency).await)
    }

    /// Transfer between two existing users. The returned operation only
    /// carries the receiver's id.
    pub async fn transfer(
        &self,
        from: UserId,
        to: UserId,
        amount: Decimal,
    ) -> LedgerResult<Operation> {
        info!(initiator_id = from, receiver_id = to, %amount, "transfer processing...");
        finish("transfer", self.apply_transfer(from, to, amount).await)
    }

    pub async fn balance(&self, id: UserId) -> LedgerResult<User> {
        info!(user_id = id, "balance processing...");
        let result = self.store.load_user(id).await.map_err(LedgerError::from);
        finish("balance", result)
    }

    /// Up to `limit` most recent operations initiated by `id`, ordered by `mode`
    pub async fn history(
        &self,
        id: UserId,
        limit: i64,
        mode: SortMode,
    ) -> LedgerResult<Vec<LedgerEntry>> {
        info!(user_id = id, limit, %mode, "history processing...");
        finish("history", self.collect_history(id, limit, mode).await)
    }

    /// Release the store. Only the first call reaches it.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.store.shutdown().await;
        info!("ledger shut down");
    }

    async fn apply_deposit(&self, id: UserId, amount: Decimal) -> LedgerResult<Operation> {
        let mut user = self.load_or_create(id).await?;
        user.deposit(amount)?;

        let operation = Operation::deposit(user, amount, Utc::now());
        self.store.commit_operation(&operation).await?;
        Ok(operation)
    }

    async fn apply_withdraw(
        &self,
        id: UserId,
        amount: Decimal,
        currency: Option<&str>,
    ) -> LedgerResult<Operation> {
        let mut user = self.store.load_user(id).await?;

        let amount = match currency.map(str::trim).filter(|c| !c.is_empty()) {
            Some(currency) => {
                let converted = self.converter.convert(currency, amount).await?;
                debug!(%currency, %amount, %converted, "withdraw amount converted");
                converted
            }
            None => amount,
        };
        user.withdraw(amount)?;

        let operation = Operation::withdraw(user, amount, Utc::now());
        self.store.commit_operation(&operation).await?;
        Ok(operation)
    }

    async fn apply_transfer(
        &self,
        from: UserId,
        to: UserId,
        amount: Decimal,
    ) -> LedgerResult<Operation> {
        if from == to {
            return Err(LedgerError::invalid_request(format!(
                "user {from} can't transfer money to itself"
            )));
        }
        let mut initiator = self.store.load_user(from).await?;
        let mut receiver = self.store.load_user(to).await?;

        initiator.withdraw(amount)?;
        receiver.deposit(amount)?;

        let mut operation = Operation::transfer_out(initiator, receiver, amount, Utc::now());
        self.store.commit_operation(&operation).await?;

        operation.redact_receiver();
        Ok(operation)
    }

    async fn collect_history(
        &self,
        id: UserId,
        limit: i64,
        mode: SortMode,
    ) -> LedgerResult<Vec<LedgerEntry>> {
        self.store.load_user(id).await?;
        if limit <= 0 {
            return Err(LedgerError::invalid_request(format!(
                "limit must be positive, got {limit}"
            )));
        }

        let mut entries = self.store.list_operations(id, limit).await?;
        mode.sort(&mut entries);
        Ok(entries)
    }

    async fn load_or_create(&self, id: UserId) -> LedgerResult<User> {
        match self.store.load_user(id).await {
            Ok(user) => Ok(user),
            Err(e) if e.is_not_found() => {
                debug!(user_id = id, "unknown user, creating");
                self.store.create_user(id).await?;
                Ok(self.store.load_user(id).await?)
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn finish<T>(operation: &str, result: LedgerResult<T>) -> LedgerResult<T> {
    match &result {
        Ok(_) => info!("{operation} processed successful"),
        Err(e) => warn!(kind = %e.kind(), "{operation} failed: {e}"),
    }
    result
}
