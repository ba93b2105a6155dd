//! Ledger requests: deposit, withdraw, transfer, balance, history
//!
//! Kết quả in ra stdout dạng JSON. Lỗi của ledger cũng là JSON
//! `{"error": <kind>, "message": ...}` để caller phân biệt được từng loại.

use anyhow::{anyhow, Result};
use clap::{Subcommand, ValueEnum};
use grossbook_business::{ErrorKind, GrossBook, LedgerResult};
use grossbook_core::{SortMode, UserId};
use rust_decimal::Decimal;
use serde::Serialize;
use std::time::Duration;

#[derive(Subcommand)]
pub enum LedgerCommand {
    /// Deposit money, creating the user if needed
    Deposit {
        /// User ID
        user_id: UserId,
        /// Amount in settlement currency
        #[arg(allow_negative_numbers = true)]
        amount: Decimal,
    },

    /// Withdraw money
    Withdraw {
        /// User ID
        user_id: UserId,
        /// Amount to withdraw
        #[arg(allow_negative_numbers = true)]
        amount: Decimal,
        /// Currency of the amount (converted to settlement currency)
        #[arg(long)]
        currency: Option<String>,
    },

    /// Transfer money between users
    Transfer {
        /// Sender user ID
        from: UserId,
        /// Receiver user ID
        to: UserId,
        /// Amount to transfer
        #[arg(allow_negative_numbers = true)]
        amount: Decimal,
    },

    /// Show user balance
    Balance {
        /// User ID
        user_id: UserId,
    },

    /// Show operations initiated by a user
    History {
        /// User ID
        user_id: UserId,
        /// Max number of recent operations
        #[arg(long, default_value_t = 10, allow_negative_numbers = true)]
        limit: i64,
        /// Sort order
        #[arg(long, default_value = "date")]
        mode: SortModeArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum SortModeArg {
    Amount,
    Date,
}

impl From<SortModeArg> for SortMode {
    fn from(arg: SortModeArg) -> Self {
        match arg {
            SortModeArg::Amount => SortMode::ByAmountDescending,
            SortModeArg::Date => SortMode::ByDateDescending,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorKind,
    message: String,
}

/// Run one request under `timeout` and print its outcome.
///
/// Returns `false` when the ledger refused the request.
pub async fn run(book: &GrossBook, command: &LedgerCommand, timeout: Duration) -> Result<bool> {
    let output = tokio::time::timeout(timeout, execute(book, command))
        .await
        .map_err(|_| anyhow!("request timed out after {}s", timeout.as_secs()))?;
    print(output)
}

async fn execute(book: &GrossBook, command: &LedgerCommand) -> LedgerResult<serde_json::Value> {
    let value = match command {
        LedgerCommand::Deposit { user_id, amount } => {
            to_json(&book.deposit(*user_id, *amount).await?)
        }
        LedgerCommand::Withdraw {
            user_id,
            amount,
            currency,
        } => to_json(&book.withdraw(*user_id, *amount, currency.as_deref()).await?),
        LedgerCommand::Transfer { from, to, amount } => {
            to_json(&book.transfer(*from, *to, *amount).await?)
        }
        LedgerCommand::Balance { user_id } => to_json(&book.balance(*user_id).await?),
        LedgerCommand::History {
            user_id,
            limit,
            mode,
        } => to_json(&book.history(*user_id, *limit, (*mode).into()).await?),
    };
    Ok(value)
}

fn to_json<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|e| serde_json::json!({ "unserializable": e.to_string() }))
}

fn print(output: LedgerResult<serde_json::Value>) -> Result<bool> {
    match output {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(true)
        }
        Err(e) => {
            let body = ErrorBody {
                error: e.kind(),
                message: e.to_string(),
            };
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(false)
        }
    }
}
