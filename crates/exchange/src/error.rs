//! Conversion errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("exchange request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("exchange api error {code}: {info}")]
    Api { code: i64, info: String },

    #[error("exchange rejected request <{code}>: {message}")]
    BadRequest { code: String, message: String },

    #[error("{0} is unsupported")]
    UnsupportedCurrency(String),

    #[error("invalid exchange response: {0}")]
    InvalidResponse(String),

    #[error("unexpected status code received from exchange: {0}")]
    UnexpectedStatus(u16),

    #[error("no rate returned for {0}")]
    UnknownRate(String),

    #[error("converted amount is out of range")]
    Overflow,
}

pub type ConversionResult<T> = Result<T, ConversionError>;

impl ConversionError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidResponse(reason.into())
    }
}
