//! SqliteLedgerStore - LedgerStore trên SQLite
//!
//! Mỗi commit chạy trong một sqlx transaction; lỗi ở bất kỳ bước nào sẽ drop
//! transaction và SQLite rollback toàn bộ.

use crate::error::{PersistenceError, PersistenceResult};
use crate::sqlite::schema::{to_nanos, OperationRow, UserRow};
use crate::store::{check_limit, records, settle, LedgerStore};
use async_trait::async_trait;
use grossbook_core::{LedgerEntry, Operation, User, UserId};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Thời gian một writer chờ write lock trước khi báo "database is locked"
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Row counts, cho lệnh `status`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub users: i64,
    pub operations: i64,
}

/// LedgerStore backed by a SQLite connection pool.
pub struct SqliteLedgerStore {
    pool: SqlitePool,
    /// Commits hold it shared, shutdown takes it exclusively
    open: RwLock<bool>,
}

impl SqliteLedgerStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            open: RwLock::new(true),
        }
    }

    /// Open (or create) the database at `database_url` and run migrations
    pub async fn open(database_url: &str) -> PersistenceResult<Self> {
        let pool = init_database(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Get SQLite connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn stats(&self) -> PersistenceResult<StoreStats> {
        let users: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        let operations: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM operations")
            .fetch_one(&self.pool)
            .await?;
        Ok(StoreStats {
            users: users.0,
            operations: operations.0,
        })
    }
}

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    async fn load_user(&self, id: UserId) -> PersistenceResult<User> {
        let mut conn = self.pool.acquire().await?;
        fetch_user(&mut conn, id).await
    }

    async fn create_user(&self, id: UserId) -> PersistenceResult<()> {
        sqlx::query("INSERT INTO users (user_id, balance) VALUES (?, '0') ON CONFLICT(user_id) DO NOTHING")
            .bind(id)
            .execute(&self.pool)
            .await?;
        debug!(user_id = id, "user created");
        Ok(())
    }

    async fn commit_operation(&self, operation: &Operation) -> PersistenceResult<()> {
        let open = self.open.read().await;
        if !*open {
            return Err(PersistenceError::NotConnected);
        }

        let sides = operation.sides()?;
        let entries = records(operation)?;

        // Write lock trước khi đọc balance: các commit xếp hàng thay vì
        // cùng giữ read snapshot rồi fail khi nâng lên write.
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;
        for (user, kind) in sides {
            let stored = fetch_user(&mut tx, user.id).await?;
            settle(&stored, user, kind, operation.amount)?;

            sqlx::query(
                "UPDATE users SET balance = ?, updated_at = CURRENT_TIMESTAMP WHERE user_id = ?",
            )
            .bind(user.balance.to_string())
            .bind(user.id)
            .execute(&mut *tx)
            .await?;
        }

        for entry in &entries {
            sqlx::query(
                r#"
                INSERT INTO operations (initiator_id, kind, amount, created_at, receiver_id)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(entry.initiator_id)
            .bind(entry.kind.as_str())
            .bind(entry.amount.to_string())
            .bind(to_nanos(entry.timestamp)?)
            .bind(entry.receiver_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(kind = %operation.kind, records = entries.len(), "operation committed");
        Ok(())
    }

    async fn list_operations(&self, id: UserId, limit: i64) -> PersistenceResult<Vec<LedgerEntry>> {
        check_limit(limit)?;
        let rows = sqlx::query_as::<_, OperationRow>(
            r#"
            SELECT id, initiator_id, kind, amount, created_at, receiver_id
            FROM operations
            WHERE initiator_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LedgerEntry::try_from).collect()
    }

    async fn shutdown(&self) {
        let mut open = self.open.write().await;
        if *open {
            *open = false;
            self.pool.close().await;
            info!("sqlite store closed");
        }
    }
}

async fn fetch_user(conn: &mut SqliteConnection, id: UserId) -> PersistenceResult<User> {
    sqlx::query_as::<_, UserRow>("SELECT user_id, balance FROM users WHERE user_id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(PersistenceError::UserNotFound(id))?
        .try_into()
}

// ============================================================================
// Database initialization
// ============================================================================

/// Chạy migrations
pub async fn run_migrations(pool: &SqlitePool) -> PersistenceResult<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

/// Tạo database mới với schema
pub async fn init_database(database_url: &str) -> PersistenceResult<SqlitePool> {
    // Tạo file nếu chưa có
    let options = database_url
        .parse::<SqliteConnectOptions>()?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use grossbook_core::{OperationKind, SortMode};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use tempfile::{tempdir, TempDir};

    async fn open_store() -> (TempDir, SqliteLedgerStore) {
        let dir = tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("ledger.db").display());
        let store = SqliteLedgerStore::open(&url).await.unwrap();
        (dir, store)
    }

    async fn seed(store: &SqliteLedgerStore, id: UserId, balance: Decimal) {
        store.create_user(id).await.unwrap();
        if !balance.is_zero() {
            let op = Operation::deposit(User::with_balance(id, balance), balance, Utc::now());
            store.commit_operation(&op).await.unwrap();
        }
    }

    fn transfer(from: (UserId, Decimal), to: (UserId, Decimal), amount: Decimal) -> Operation {
        Operation::transfer_out(
            User::with_balance(from.0, from.1),
            User::with_balance(to.0, to.1),
            amount,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_create_and_load_user() {
        let (_dir, store) = open_store().await;

        assert!(matches!(
            store.load_user(1).await,
            Err(PersistenceError::UserNotFound(1))
        ));
        store.create_user(1).await.unwrap();
        // idempotent
        store.create_user(1).await.unwrap();
        assert_eq!(store.load_user(1).await.unwrap(), User::new(1));
    }

    #[tokio::test]
    async fn test_commit_deposit() {
        let (_dir, store) = open_store().await;
        seed(&store, 1, dec!(100)).await;

        assert_eq!(store.load_user(1).await.unwrap().balance, dec!(100));
        let entries = store.list_operations(1, 10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, OperationKind::Deposit);
        assert_eq!(entries[0].amount, dec!(100));
        assert_eq!(entries[0].receiver_id, None);
    }

    #[tokio::test]
    async fn test_commit_transfer_stores_mirror() {
        let (_dir, store) = open_store().await;
        seed(&store, 1, dec!(100)).await;
        seed(&store, 2, dec!(10)).await;

        let op = transfer((1, dec!(60)), (2, dec!(50)), dec!(40));
        store.commit_operation(&op).await.unwrap();

        assert_eq!(store.load_user(1).await.unwrap().balance, dec!(60));
        assert_eq!(store.load_user(2).await.unwrap().balance, dec!(50));

        let out = store.list_operations(1, 1).await.unwrap();
        let incoming = store.list_operations(2, 1).await.unwrap();
        assert_eq!(out[0].kind, OperationKind::TransferOut);
        assert_eq!(out[0].receiver_id, Some(2));
        assert_eq!(incoming[0].kind, OperationKind::TransferIn);
        assert_eq!(incoming[0].receiver_id, Some(1));
        assert_eq!(out[0].amount, incoming[0].amount);
        assert_eq!(out[0].timestamp, op.timestamp);
        assert_eq!(incoming[0].timestamp, op.timestamp);
    }

    #[tokio::test]
    async fn test_failed_receiver_write_rolls_back_transfer() {
        let (_dir, store) = open_store().await;
        seed(&store, 1, dec!(100)).await;
        seed(&store, 2, dec!(10)).await;

        // initiator's balance update goes through, receiver's aborts
        sqlx::query(
            r#"
            CREATE TRIGGER fail_receiver BEFORE UPDATE OF balance ON users
            WHEN NEW.user_id = 2
            BEGIN
                SELECT RAISE(ABORT, 'receiver write failed');
            END;
            "#,
        )
        .execute(store.pool())
        .await
        .unwrap();

        let op = transfer((1, dec!(60)), (2, dec!(50)), dec!(40));
        let err = store.commit_operation(&op).await.unwrap_err();
        assert!(err.is_database_error());

        assert_eq!(store.load_user(1).await.unwrap().balance, dec!(100));
        assert_eq!(store.load_user(2).await.unwrap().balance, dec!(10));
        assert_eq!(store.list_operations(1, 10).await.unwrap().len(), 1);
        assert_eq!(store.list_operations(2, 10).await.unwrap().len(), 1);
        assert_eq!(store.stats().await.unwrap().operations, 2);
    }

    #[tokio::test]
    async fn test_commit_unknown_receiver() {
        let (_dir, store) = open_store().await;
        seed(&store, 1, dec!(100)).await;

        let op = transfer((1, dec!(60)), (9, dec!(40)), dec!(40));
        assert!(matches!(
            store.commit_operation(&op).await,
            Err(PersistenceError::UserNotFound(9))
        ));
        assert_eq!(store.load_user(1).await.unwrap().balance, dec!(100));
    }

    async fn deposit_ten(store: Arc<SqliteLedgerStore>, id: UserId) -> PersistenceResult<()> {
        let mut user = store.load_user(id).await?;
        user.deposit(dec!(10))?;
        store
            .commit_operation(&Operation::deposit(user, dec!(10), Utc::now()))
            .await
    }

    async fn withdraw_ten(store: Arc<SqliteLedgerStore>, id: UserId) -> PersistenceResult<()> {
        let mut user = store.load_user(id).await?;
        user.withdraw(dec!(10))?;
        store
            .commit_operation(&Operation::withdraw(user, dec!(10), Utc::now()))
            .await
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_disjoint_users_commit_concurrently() {
        let (_dir, store) = open_store().await;
        let store = Arc::new(store);
        for id in 1..=8 {
            store.create_user(id).await.unwrap();
        }

        let tasks: Vec<_> = (1..=8)
            .map(|id| tokio::spawn(deposit_ten(Arc::clone(&store), id)))
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        for id in 1..=8 {
            assert_eq!(store.load_user(id).await.unwrap().balance, dec!(10));
        }
        assert_eq!(store.stats().await.unwrap().operations, 8);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_withdrawals_lose_no_update() {
        let (_dir, store) = open_store().await;
        seed(&store, 1, dec!(100)).await;
        let store = Arc::new(store);

        let tasks: Vec<_> = (0..8)
            .map(|_| tokio::spawn(withdraw_ten(Arc::clone(&store), 1)))
            .collect();
        let mut committed = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(()) => committed += 1,
                Err(err) => assert!(
                    matches!(err, PersistenceError::Conflict(1)),
                    "unexpected error: {err}"
                ),
            }
        }

        assert!(committed >= 1);
        let balance = store.load_user(1).await.unwrap().balance;
        assert_eq!(balance, dec!(100) - Decimal::from(10 * committed));
        // seed deposit + one record per committed withdrawal
        let entries = store.list_operations(1, 100).await.unwrap();
        assert_eq!(entries.len(), 1 + committed as usize);
        assert_eq!(store.stats().await.unwrap().operations, 1 + committed);
    }

    #[tokio::test]
    async fn test_stale_commit_is_a_conflict() {
        let (_dir, store) = open_store().await;
        seed(&store, 1, dec!(100)).await;

        // two withdrawals computed from the same loaded balance
        let first = Operation::withdraw(User::with_balance(1, dec!(30)), dec!(70), Utc::now());
        let second = Operation::withdraw(User::with_balance(1, dec!(50)), dec!(50), Utc::now());
        store.commit_operation(&first).await.unwrap();
        assert!(matches!(
            store.commit_operation(&second).await,
            Err(PersistenceError::Conflict(1))
        ));
        assert_eq!(store.load_user(1).await.unwrap().balance, dec!(30));
    }

    #[tokio::test]
    async fn test_list_operations_recency_and_limit() {
        let (_dir, store) = open_store().await;
        store.create_user(1).await.unwrap();

        let start = Utc::now();
        let mut balance = Decimal::ZERO;
        for (i, amount) in [dec!(30), dec!(10), dec!(20)].into_iter().enumerate() {
            balance += amount;
            let op = Operation::deposit(
                User::with_balance(1, balance),
                amount,
                start + Duration::seconds(i as i64),
            );
            store.commit_operation(&op).await.unwrap();
        }

        let mut entries = store.list_operations(1, 2).await.unwrap();
        let amounts: Vec<_> = entries.iter().map(|e| e.amount).collect();
        assert_eq!(amounts, vec![dec!(20), dec!(10)]);

        SortMode::ByAmountDescending.sort(&mut entries);
        assert_eq!(entries[0].amount, dec!(20));

        assert!(matches!(
            store.list_operations(1, -1).await,
            Err(PersistenceError::InvalidLimit(-1))
        ));
    }

    #[tokio::test]
    async fn test_shutdown_closes_pool() {
        let (_dir, store) = open_store().await;
        seed(&store, 1, dec!(5)).await;

        store.shutdown().await;
        store.shutdown().await;

        assert!(matches!(
            store.load_user(1).await,
            Err(PersistenceError::NotConnected)
        ));
        let op = Operation::deposit(User::with_balance(1, dec!(6)), dec!(1), Utc::now());
        assert!(matches!(
            store.commit_operation(&op).await,
            Err(PersistenceError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_stats() {
        let (_dir, store) = open_store().await;
        seed(&store, 1, dec!(5)).await;
        seed(&store, 2, Decimal::ZERO).await;

        let stats = store.stats().await.unwrap();
        assert_eq!(stats, StoreStats { users: 2, operations: 1 });
    }
}
