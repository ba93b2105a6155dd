//! # User Module
//!
//! User - chủ sở hữu một số dư duy nhất, tính bằng settlement currency.
//! Số dư chỉ thay đổi qua `deposit` / `withdraw`, luôn check trước rồi mới mutate.

use crate::error::{CoreError, CoreResult};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// External identifier của user
pub type UserId = i64;

/// f64 machine epsilon (2^-52 = 2.220446049250313e-16), truncated to Decimal's 28-digit scale.
///
/// Every Decimal up to and including `EPSILON` lies below the real epsilon,
/// so amounts in `[0, EPSILON]` are rejected as zero.
// TODO: confirm with product whether sub-epsilon amounts should become a minimum-unit rule.
pub const EPSILON: Decimal = dec!(0.0000000000000002220446049250);

/// User entity với số dư không âm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Số dư; bỏ qua khi serialize nếu bằng 0 (receiver đã bị ẩn số dư)
    #[serde(default, skip_serializing_if = "Decimal::is_zero")]
    pub balance: Decimal,
}

impl User {
    /// Tạo user mới với balance = 0
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            balance: Decimal::ZERO,
        }
    }

    /// Tạo user với số dư có sẵn (load từ storage)
    pub fn with_balance(id: UserId, balance: Decimal) -> Self {
        Self { id, balance }
    }

    /// Tăng số dư.
    ///
    /// # Errors
    /// - `ZeroAmount` nếu `0 <= amount <= EPSILON`
    /// - `NegativeAmount` nếu `amount < 0`
    /// - `Overflow` nếu `balance + amount > Decimal::MAX`, hoặc tổng cần
    ///   nhiều hơn 28 chữ số và Decimal sẽ làm tròn mất tiền
    pub fn deposit(&mut self, amount: Decimal) -> CoreResult<()> {
        check_amount(amount)?;
        if self.balance > Decimal::MAX - amount {
            return Err(CoreError::Overflow);
        }
        let balance = self
            .balance
            .checked_add(amount)
            .ok_or(CoreError::Overflow)?;
        if !is_exact_sum(self.balance, amount, balance) {
            return Err(CoreError::Overflow);
        }
        self.balance = balance;
        Ok(())
    }

    /// Giảm số dư.
    ///
    /// # Errors
    /// - `ZeroAmount` / `NegativeAmount` như `deposit`
    /// - `InsufficientFunds` nếu `balance < amount`
    /// - `Overflow` nếu hiệu không biểu diễn chính xác được
    pub fn withdraw(&mut self, amount: Decimal) -> CoreResult<()> {
        check_amount(amount)?;
        if self.balance < amount {
            return Err(CoreError::InsufficientFunds {
                needed: amount,
                available: self.balance,
            });
        }
        let balance = self.balance - amount;
        if !is_exact_sum(balance, amount, self.balance) {
            return Err(CoreError::Overflow);
        }
        self.balance = balance;
        Ok(())
    }

    /// Bản sao chỉ còn identifier (ẩn số dư)
    pub fn identity(&self) -> User {
        User::new(self.id)
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user {} ({})", self.id, self.balance)
    }
}

/// `sum` is exactly `a + b`, not a rounded result.
///
/// Both differences are needed: a rounded sum can still give back one of the
/// operands when that subtraction rounds the same way.
fn is_exact_sum(a: Decimal, b: Decimal, sum: Decimal) -> bool {
    sum - b == a && sum - a == b
}

fn check_amount(amount: Decimal) -> CoreResult<()> {
    // machine zero or minimal value
    if amount >= Decimal::ZERO && amount <= EPSILON {
        return Err(CoreError::ZeroAmount);
    }
    if amount < Decimal::ZERO {
        return Err(CoreError::NegativeAmount);
    }
    Ok(())
}
