//! # GrossBook Exchange
//!
//! Currency conversion cho withdraw bằng ngoại tệ. Ledger chỉ biết trait
//! [`Converter`]; [`ExchangeRatesClient`] gọi exchangeratesapi.io, còn
//! [`FixedRateConverter`] dùng bảng rate cố định.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use grossbook_exchange::{Converter, ExchangeConfig, ExchangeRatesClient};
//!
//! let client = ExchangeRatesClient::new(ExchangeConfig::new(api_key))?;
//! let rub = client.convert("EUR", dec!(10)).await?;
//! ```

pub mod client;
pub mod converter;
pub mod error;
pub mod rates;

pub use client::{ExchangeConfig, ExchangeRatesClient, DEFAULT_API_URL, DEFAULT_SETTLEMENT_CURRENCY};
pub use converter::{Converter, FixedRateConverter};
pub use error::{ConversionError, ConversionResult};
