//! # Operation Module
//!
//! Operation - một bản ghi ledger bất biến (deposit, withdraw, hoặc một phía của transfer).
//!
//! Transfer được lưu thành hai bản ghi: `TransferOut` cho initiator và bản
//! mirror `TransferIn` cho receiver, liên hệ bởi `Operation::reverse`.

use crate::error::{CoreError, CoreResult};
use crate::user::{User, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Loại operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    #[serde(rename = "DEPOSIT")]
    Deposit,
    #[serde(rename = "WITHDRAW")]
    Withdraw,
    #[serde(rename = "TRANSFER OUT")]
    TransferOut,
    #[serde(rename = "TRANSFER IN")]
    TransferIn,
}

impl OperationKind {
    /// Trả về code string cho DB
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Deposit => "DEPOSIT",
            OperationKind::Withdraw => "WITHDRAW",
            OperationKind::TransferOut => "TRANSFER OUT",
            OperationKind::TransferIn => "TRANSFER IN",
        }
    }

    pub fn is_transfer(&self) -> bool {
        matches!(self, OperationKind::TransferOut | OperationKind::TransferIn)
    }

    /// Phía đối diện của transfer; `None` cho deposit/withdraw
    pub fn mirrored(&self) -> Option<OperationKind> {
        match self {
            OperationKind::TransferOut => Some(OperationKind::TransferIn),
            OperationKind::TransferIn => Some(OperationKind::TransferOut),
            OperationKind::Deposit | OperationKind::Withdraw => None,
        }
    }

    /// Áp dụng hiệu ứng số dư của loại operation lên `user`
    pub fn apply(&self, user: &mut User, amount: Decimal) -> CoreResult<()> {
        match self {
            OperationKind::Deposit | OperationKind::TransferIn => user.deposit(amount),
            OperationKind::Withdraw | OperationKind::TransferOut => user.withdraw(amount),
        }
    }
}

impl FromStr for OperationKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEPOSIT" => Ok(OperationKind::Deposit),
            "WITHDRAW" => Ok(OperationKind::Withdraw),
            "TRANSFER OUT" => Ok(OperationKind::TransferOut),
            "TRANSFER IN" => Ok(OperationKind::TransferIn),
            other => Err(CoreError::incorrect(format!(
                "incorrect operation type: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Một sự kiện giao dịch.
///
/// `initiator` là `Option` vì operation có thể đến từ bên ngoài (deserialize)
/// và phải đi qua `validate` trước khi được commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub initiator: Option<User>,
    #[serde(rename = "type")]
    pub kind: OperationKind,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<User>,
}

impl Operation {
    // === Factory methods ===

    pub fn deposit(user: User, amount: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self {
            initiator: Some(user),
            kind: OperationKind::Deposit,
            amount,
            timestamp,
            receiver: None,
        }
    }

    pub fn withdraw(user: User, amount: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self {
            initiator: Some(user),
            kind: OperationKind::Withdraw,
            amount,
            timestamp,
            receiver: None,
        }
    }

    pub fn transfer_out(
        initiator: User,
        receiver: User,
        amount: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            initiator: Some(initiator),
            kind: OperationKind::TransferOut,
            amount,
            timestamp,
            receiver: Some(receiver),
        }
    }

    pub fn is_transfer(&self) -> bool {
        self.kind.is_transfer()
    }

    /// Kiểm tra tương quan giữa type và số lượng users.
    ///
    /// Initiator luôn bắt buộc; receiver bắt buộc với transfer và bị cấm với
    /// deposit/withdraw. Type không hợp lệ bị chặn khi parse (`OperationKind::from_str`).
    pub fn validate(&self) -> CoreResult<()> {
        if self.initiator.is_none() {
            return Err(CoreError::incorrect("initiator can't be empty"));
        }
        match (self.is_transfer(), self.receiver.is_some()) {
            (true, false) => Err(CoreError::incorrect(
                "receiver can't be empty in transfer operation",
            )),
            (false, true) => Err(CoreError::incorrect(format!(
                "receiver isn't allowed in {} operation",
                self.kind
            ))),
            _ => Ok(()),
        }
    }

    /// Bản ghi mirror của transfer: đổi initiator/receiver, lật TransferOut <-> TransferIn.
    ///
    /// Amount và timestamp được giữ nguyên.
    pub fn reverse(&self) -> CoreResult<Operation> {
        self.validate()?;
        let kind = self
            .kind
            .mirrored()
            .ok_or_else(|| CoreError::NonTransferOperation(self.kind.to_string()))?;
        Ok(Operation {
            initiator: self.receiver.clone(),
            kind,
            amount: self.amount,
            timestamp: self.timestamp,
            receiver: self.initiator.clone(),
        })
    }

    pub fn initiator(&self) -> CoreResult<&User> {
        self.initiator
            .as_ref()
            .ok_or_else(|| CoreError::incorrect("initiator can't be empty"))
    }

    /// Từng user được tham chiếu cùng loại operation tác động lên số dư của họ.
    ///
    /// Receiver của transfer nhận phía mirror (TransferOut -> TransferIn).
    pub fn sides(&self) -> CoreResult<Vec<(&User, OperationKind)>> {
        self.validate()?;
        let mut sides = vec![(self.initiator()?, self.kind)];
        if let (Some(receiver), Some(kind)) = (self.receiver.as_ref(), self.kind.mirrored()) {
            sides.push((receiver, kind));
        }
        Ok(sides)
    }

    /// Tất cả users mà operation tham chiếu (initiator trước)
    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.initiator.iter().chain(self.receiver.iter())
    }

    /// Ẩn số dư của receiver, chỉ giữ identifier
    pub fn redact_receiver(&mut self) {
        if let Some(receiver) = self.receiver.as_mut() {
            *receiver = receiver.identity();
        }
    }

    /// Chiếu thành bản ghi chỉ gồm identifiers (dạng lưu trữ)
    pub fn entry(&self) -> CoreResult<LedgerEntry> {
        self.validate()?;
        Ok(LedgerEntry {
            initiator_id: self.initiator()?.id,
            kind: self.kind,
            amount: self.amount,
            timestamp: self.timestamp,
            receiver_id: self.receiver.as_ref().map(|r| r.id),
        })
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let initiator = self.initiator.as_ref().map(|u| u.id);
        write!(
            f,
            "[{}] {} {} by {:?}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.kind,
            self.amount,
            initiator
        )?;
        if let Some(receiver) = &self.receiver {
            write!(f, " with {}", receiver.id)?;
        }
        Ok(())
    }
}

/// Bản ghi history: Operation chỉ với identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub initiator_id: UserId,
    #[serde(rename = "type")]
    pub kind: OperationKind,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<UserId>,
}

/// Thứ tự sắp xếp history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortMode {
    #[serde(rename = "amount")]
    ByAmountDescending,
    #[serde(rename = "date")]
    ByDateDescending,
}

impl SortMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::ByAmountDescending => "amount",
            SortMode::ByDateDescending => "date",
        }
    }

    /// Stable sort, giảm dần theo amount hoặc timestamp
    pub fn sort(&self, entries: &mut [LedgerEntry]) {
        match self {
            SortMode::ByAmountDescending => entries.sort_by(|a, b| b.amount.cmp(&a.amount)),
            SortMode::ByDateDescending => entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
        }
    }
}

impl FromStr for SortMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "amount" => Ok(SortMode::ByAmountDescending),
            "date" => Ok(SortMode::ByDateDescending),
            other => Err(CoreError::incorrect(format!("unknown sorting mode: {}", other))),
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn transfer() -> Operation {
        Operation::transfer_out(
            User::with_balance(1, dec!(60)),
            User::with_balance(2, dec!(50)),
            dec!(40),
            at(0),
        )
    }

    #[test]
    fn test_kind_is_transfer() {
        assert!(OperationKind::TransferIn.is_transfer());
        assert!(OperationKind::TransferOut.is_transfer());
        assert!(!OperationKind::Deposit.is_transfer());
        assert!(!OperationKind::Withdraw.is_transfer());
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("TRANSFER OUT".parse(), Ok(OperationKind::TransferOut));
        assert_eq!("DEPOSIT".parse(), Ok(OperationKind::Deposit));
        let err = "REFUND".parse::<OperationKind>().unwrap_err();
        assert!(matches!(err, CoreError::IncorrectOperationParams(_)));
    }

    #[test]
    fn test_validate() {
        let mut op = Operation::deposit(User::new(1), dec!(10), at(0));
        assert!(op.validate().is_ok());

        op.receiver = Some(User::new(2));
        assert!(matches!(
            op.validate(),
            Err(CoreError::IncorrectOperationParams(_))
        ));

        op.kind = OperationKind::TransferIn;
        assert!(op.validate().is_ok());

        op.receiver = None;
        assert!(matches!(
            op.validate(),
            Err(CoreError::IncorrectOperationParams(_))
        ));

        op.initiator = None;
        let err = op.validate().unwrap_err();
        assert_eq!(
            err,
            CoreError::incorrect("initiator can't be empty")
        );
    }

    #[test]
    fn test_reverse_transfer() {
        let op = transfer();
        let reversed = op.reverse().unwrap();

        assert_eq!(reversed.kind, OperationKind::TransferIn);
        assert_eq!(reversed.initiator, Some(User::with_balance(2, dec!(50))));
        assert_eq!(reversed.receiver, Some(User::with_balance(1, dec!(60))));
        assert_eq!(reversed.amount, op.amount);
        assert_eq!(reversed.timestamp, op.timestamp);
    }

    #[test]
    fn test_reverse_twice_is_identity() {
        let op = transfer();
        assert_eq!(op.reverse().unwrap().reverse().unwrap(), op);

        let mut incoming = transfer();
        incoming.kind = OperationKind::TransferIn;
        assert_eq!(incoming.reverse().unwrap().reverse().unwrap(), incoming);
    }

    #[test]
    fn test_reverse_rejects_non_transfer() {
        let op = Operation::withdraw(User::new(1), dec!(5), at(0));
        assert_eq!(
            op.reverse(),
            Err(CoreError::NonTransferOperation("WITHDRAW".to_string()))
        );

        let mut invalid = transfer();
        invalid.receiver = None;
        assert!(matches!(
            invalid.reverse(),
            Err(CoreError::IncorrectOperationParams(_))
        ));
    }

    #[test]
    fn test_kind_apply() {
        let mut user = User::with_balance(1, dec!(10));
        OperationKind::TransferIn.apply(&mut user, dec!(5)).unwrap();
        assert_eq!(user.balance, dec!(15));
        OperationKind::Withdraw.apply(&mut user, dec!(15)).unwrap();
        assert_eq!(user.balance, Decimal::ZERO);
        assert!(OperationKind::TransferOut
            .apply(&mut user, dec!(1))
            .unwrap_err()
            .is_insufficient_funds());
    }

    #[test]
    fn test_sides() {
        let op = transfer();
        let sides = op.sides().unwrap();
        assert_eq!(sides.len(), 2);
        assert_eq!((sides[0].0.id, sides[0].1), (1, OperationKind::TransferOut));
        assert_eq!((sides[1].0.id, sides[1].1), (2, OperationKind::TransferIn));

        let op = Operation::deposit(User::new(4), dec!(1), at(0));
        assert_eq!(op.sides().unwrap().len(), 1);
    }

    #[test]
    fn test_redact_receiver() {
        let mut op = transfer();
        op.redact_receiver();
        assert_eq!(op.receiver, Some(User::new(2)));
        assert_eq!(op.initiator().unwrap().balance, dec!(60));
    }

    #[test]
    fn test_entry_projection() {
        let entry = transfer().entry().unwrap();
        assert_eq!(entry.initiator_id, 1);
        assert_eq!(entry.receiver_id, Some(2));
        assert_eq!(entry.kind, OperationKind::TransferOut);

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "TRANSFER OUT");
        assert_eq!(json["amount"], "40");
    }

    #[test]
    fn test_sort_modes() {
        let entry = |amount: Decimal, secs: i64| LedgerEntry {
            initiator_id: 1,
            kind: OperationKind::Deposit,
            amount,
            timestamp: at(secs),
            receiver_id: None,
        };
        let mut entries = vec![entry(dec!(5), 2), entry(dec!(50), 1), entry(dec!(5), 3)];

        SortMode::ByAmountDescending.sort(&mut entries);
        let amounts: Vec<_> = entries.iter().map(|e| e.amount).collect();
        assert_eq!(amounts, vec![dec!(50), dec!(5), dec!(5)]);
        // stable: equal amounts keep their relative order
        assert_eq!(entries[1].timestamp, at(2));

        SortMode::ByDateDescending.sort(&mut entries);
        let times: Vec<_> = entries.iter().map(|e| e.timestamp).collect();
        assert_eq!(times, vec![at(3), at(2), at(1)]);
    }

    #[test]
    fn test_sort_mode_parse() {
        assert_eq!("amount".parse(), Ok(SortMode::ByAmountDescending));
        assert_eq!("DATE".parse(), Ok(SortMode::ByDateDescending));
        assert!("size".parse::<SortMode>().is_err());
    }
}
