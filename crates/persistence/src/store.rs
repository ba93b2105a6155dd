//! LedgerStore - persistence contract mà ledger engine cần.
//!
//! Engine chỉ giữ một `Arc<dyn LedgerStore>`; connection pool và schema thuộc
//! về implementation (SQLite, in-memory, ...).

use crate::error::{PersistenceError, PersistenceResult};
use async_trait::async_trait;
use grossbook_core::{CoreError, LedgerEntry, Operation, OperationKind, User, UserId};
use rust_decimal::Decimal;

/// Transactional storage for users and operations.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Load the current balance of `id`.
    ///
    /// Fails with `UserNotFound` if the user doesn't exist.
    async fn load_user(&self, id: UserId) -> PersistenceResult<User>;

    /// Create `id` with a zero balance. Creating an existing user is a no-op.
    async fn create_user(&self, id: UserId) -> PersistenceResult<()>;

    /// Atomically write the balance of every user referenced by `operation`
    /// and append its record(s).
    ///
    /// A transfer (`TransferOut`) also stores the mirrored `TransferIn` record
    /// for the receiver. Either everything is written or nothing is.
    async fn commit_operation(&self, operation: &Operation) -> PersistenceResult<()>;

    /// At most `limit` most recent operations initiated by `id`, newest first.
    async fn list_operations(&self, id: UserId, limit: i64) -> PersistenceResult<Vec<LedgerEntry>>;

    /// Release resources. Waits for in-flight commits; later calls do nothing.
    async fn shutdown(&self);
}

/// Re-apply one side of an operation to the stored state of its user.
///
/// The balance carried by the operation must be exactly what applying `kind`
/// to the stored balance yields, otherwise someone committed in between.
pub(crate) fn settle(
    stored: &User,
    target: &User,
    kind: OperationKind,
    amount: Decimal,
) -> PersistenceResult<()> {
    let mut replayed = stored.clone();
    kind.apply(&mut replayed, amount).map_err(|err| match err {
        // depends on the stored balance: it moved underneath us
        CoreError::InsufficientFunds { .. } | CoreError::Overflow => {
            PersistenceError::Conflict(target.id)
        }
        other => PersistenceError::Rejected(other),
    })?;
    if replayed.balance != target.balance {
        return Err(PersistenceError::Conflict(target.id));
    }
    Ok(())
}

/// Records to append for `operation`: the operation itself plus the mirror of a transfer.
pub(crate) fn records(operation: &Operation) -> PersistenceResult<Vec<LedgerEntry>> {
    let mut entries = vec![operation.entry()?];
    if operation.is_transfer() {
        entries.push(operation.reverse()?.entry()?);
    }
    Ok(entries)
}

pub(crate) fn check_limit(limit: i64) -> PersistenceResult<()> {
    if limit <= 0 {
        return Err(PersistenceError::InvalidLimit(limit));
    }
    Ok(())
}
