//! Wire models của exchangeratesapi.io v1 và phần tính toán trên response
//!
//! Mọi thứ ở đây là pure: client chỉ lo HTTP, còn validate + công thức quy đổi
//! nằm ở đây để test không cần network.

use crate::error::{ConversionError, ConversionResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;
use std::collections::{BTreeSet, HashMap};

/// Base currency mà plan free của provider trả rates theo
pub const BASE_CURRENCY: &str = "EUR";

/// `{ "code": 101, "info": "..." }` - lỗi nằm trong body của response 200
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub info: String,
}

impl From<ApiError> for ConversionError {
    fn from(err: ApiError) -> Self {
        ConversionError::Api {
            code: err.code,
            info: err.info,
        }
    }
}

/// Body of an HTTP 400 answer
#[derive(Debug, Deserialize)]
pub struct BadRequestResponse {
    pub error: BadRequestError,
}

#[derive(Debug, Deserialize)]
pub struct BadRequestError {
    pub code: String,
    pub message: String,
}

impl From<BadRequestResponse> for ConversionError {
    fn from(body: BadRequestResponse) -> Self {
        ConversionError::BadRequest {
            code: body.error.code,
            message: body.error.message,
        }
    }
}

/// GET /symbols
#[derive(Debug, Deserialize)]
pub struct SymbolsResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<ApiError>,
    #[serde(default)]
    pub symbols: Option<HashMap<String, String>>,
}

impl SymbolsResponse {
    pub fn currencies(self) -> ConversionResult<SupportedCurrencies> {
        if !self.success {
            return Err(self.error.unwrap_or_default().into());
        }
        match self.symbols {
            Some(symbols) if !symbols.is_empty() => {
                Ok(SupportedCurrencies(symbols.into_keys().collect()))
            }
            _ => Err(ConversionError::invalid("there is no supported currency")),
        }
    }
}

/// Currency codes the provider knows about
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupportedCurrencies(BTreeSet<String>);

impl SupportedCurrencies {
    pub fn contains(&self, currency: &str) -> bool {
        self.0.contains(currency)
    }

    /// Fails on the first code that isn't supported
    pub fn require_all(&self, currencies: &[&str]) -> ConversionResult<()> {
        match currencies.iter().find(|c| !self.contains(c)) {
            Some(missing) => Err(ConversionError::UnsupportedCurrency(missing.to_string())),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for SupportedCurrencies {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// GET /latest
#[derive(Debug, Deserialize)]
pub struct LatestRatesResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<ApiError>,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub base: String,
    #[serde(default)]
    pub date: String,
    #[serde(default, deserialize_with = "deserialize_rates")]
    pub rates: HashMap<String, Decimal>,
}

impl LatestRatesResponse {
    /// Rate của `currency` so với base; base không có trong map thì là 1
    pub fn rate(&self, currency: &str) -> ConversionResult<Decimal> {
        match self.rates.get(currency) {
            Some(rate) => Ok(*rate),
            None if currency == self.base => Ok(Decimal::ONE),
            None => Err(ConversionError::UnknownRate(currency.to_string())),
        }
    }

    /// Check the response before trusting its numbers
    pub fn validate(&self, from: &str, settlement: &str) -> ConversionResult<()> {
        if !self.success {
            return Err(ConversionError::invalid("conversion response body is empty"));
        }
        if self.base != BASE_CURRENCY {
            return Err(ConversionError::invalid(format!(
                "returned unsupported base currency: {}",
                self.base
            )));
        }
        match self.rates.len() {
            0 => return Err(ConversionError::invalid("returned empty rates map")),
            1 | 2 => {
                self.rate(from)?;
                self.rate(settlement)?;
            }
            _ => return Err(ConversionError::invalid("too many currencies in rates map")),
        }
        if let Some((currency, rate)) = self.rates.iter().find(|(_, rate)| **rate <= Decimal::ZERO) {
            return Err(ConversionError::invalid(format!(
                "returned non-positive rate {rate} for {currency}"
            )));
        }
        Ok(())
    }

    /// `amount / rate[from] * rate[settlement]`
    pub fn amount(&self, amount: Decimal, from: &str, settlement: &str) -> ConversionResult<Decimal> {
        if !self.success {
            if let Some(err) = &self.error {
                return Err(err.clone().into());
            }
        }
        self.validate(from, settlement)?;
        if from == settlement {
            return Ok(amount);
        }

        amount
            .checked_div(self.rate(from)?)
            .and_then(|base_amount| base_amount.checked_mul(self.rate(settlement).ok()?))
            .ok_or(ConversionError::Overflow)
    }
}

/// Provider trả rates dạng JSON number; parse qua string để không đi qua f64
fn deserialize_rates<'de, D>(deserializer: D) -> Result<HashMap<String, Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let raw: HashMap<String, JsonValue> = HashMap::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(currency, value)| {
            let text = match value {
                JsonValue::Number(n) => n.to_string(),
                JsonValue::String(s) => s,
                other => {
                    return Err(D::Error::custom(format!(
                        "expected number for rate {currency}, got {other}"
                    )))
                }
            };
            let rate = text
                .parse::<Decimal>()
                .or_else(|_| Decimal::from_scientific(&text))
                .map_err(|e| D::Error::custom(format!("invalid rate for {currency}: {e}")))?;
            Ok((currency, rate))
        })
        .collect()
}
