//! Converter contract + static-table implementation

use crate::error::{ConversionError, ConversionResult};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Quy đổi một khoản tiền ngoại tệ sang settlement currency
#[async_trait]
pub trait Converter: Send + Sync {
    async fn convert(&self, from: &str, amount: Decimal) -> ConversionResult<Decimal>;
}

/// Converter with a fixed table of settlement units per 1 unit of currency.
///
/// Dùng cho tests và khi chạy offline không có API key.
#[derive(Debug, Clone)]
pub struct FixedRateConverter {
    settlement: String,
    rates: HashMap<String, Decimal>,
}

impl FixedRateConverter {
    pub fn new(settlement: impl Into<String>) -> Self {
        Self {
            settlement: settlement.into().to_uppercase(),
            rates: HashMap::new(),
        }
    }

    /// 1 `currency` = `rate` settlement units
    pub fn with_rate(mut self, currency: &str, rate: Decimal) -> Self {
        self.rates.insert(currency.to_uppercase(), rate);
        self
    }
}

#[async_trait]
impl Converter for FixedRateConverter {
    async fn convert(&self, from: &str, amount: Decimal) -> ConversionResult<Decimal> {
        let from = from.trim().to_uppercase();
        if from == self.settlement {
            return Ok(amount);
        }
        let rate = self
            .rates
            .get(&from)
            .ok_or_else(|| ConversionError::UnsupportedCurrency(from.clone()))?;
        amount.checked_mul(*rate).ok_or(ConversionError::Overflow)
    }
}
