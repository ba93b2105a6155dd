//! Database schema definitions
//!
//! Row types cho sqlx mapping từ SQLite tables.
//! Schema được định nghĩa trong migrations/20261019000000_init.sql

use crate::error::{PersistenceError, PersistenceResult};
use chrono::{DateTime, Utc};
use grossbook_core::{LedgerEntry, OperationKind, User};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Row type cho bảng `users`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub user_id: i64,
    pub balance: String, // Decimal stored as TEXT
}

/// Row type cho bảng `operations`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OperationRow {
    pub id: i64,
    pub initiator_id: i64,
    pub kind: String,
    pub amount: String,  // Decimal stored as TEXT
    pub created_at: i64, // nanoseconds since epoch
    pub receiver_id: Option<i64>,
}

// === Conversion implementations ===

pub(crate) fn parse_decimal(value: &str) -> PersistenceResult<Decimal> {
    Decimal::from_str(value).map_err(|e| PersistenceError::InvalidDecimal(e.to_string()))
}

pub(crate) fn to_nanos(timestamp: DateTime<Utc>) -> PersistenceResult<i64> {
    timestamp
        .timestamp_nanos_opt()
        .ok_or_else(|| PersistenceError::InvalidTimestamp(timestamp.to_rfc3339()))
}

pub(crate) fn from_nanos(nanos: i64) -> PersistenceResult<DateTime<Utc>> {
    let secs = nanos.div_euclid(1_000_000_000);
    let subsec = nanos.rem_euclid(1_000_000_000) as u32;
    DateTime::from_timestamp(secs, subsec)
        .ok_or_else(|| PersistenceError::InvalidTimestamp(nanos.to_string()))
}

impl TryFrom<UserRow> for User {
    type Error = PersistenceError;

    fn try_from(row: UserRow) -> PersistenceResult<Self> {
        Ok(User::with_balance(row.user_id, parse_decimal(&row.balance)?))
    }
}

impl TryFrom<OperationRow> for LedgerEntry {
    type Error = PersistenceError;

    fn try_from(row: OperationRow) -> PersistenceResult<Self> {
        Ok(LedgerEntry {
            initiator_id: row.initiator_id,
            kind: OperationKind::from_str(&row.kind)?,
            amount: parse_decimal(&row.amount)?,
            timestamp: from_nanos(row.created_at)?,
            receiver_id: row.receiver_id,
        })
    }
}
