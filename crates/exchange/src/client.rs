//! ExchangeRatesClient - exchangeratesapi.io v1 over reqwest
//!
//! Mỗi lần convert gọi hai request: `symbols` để kiểm tra currency được hỗ trợ,
//! rồi `latest` lấy rates theo base EUR.

use crate::converter::Converter;
use crate::error::{ConversionError, ConversionResult};
use crate::rates::{
    BadRequestResponse, LatestRatesResponse, SupportedCurrencies, SymbolsResponse, BASE_CURRENCY,
};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_API_URL: &str = "http://api.exchangeratesapi.io/v1/";
pub const DEFAULT_SETTLEMENT_CURRENCY: &str = "RUB";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const SYMBOLS: &str = "symbols";
const LATEST: &str = "latest";

#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    pub api_url: String,
    pub api_key: String,
    pub settlement_currency: String,
    pub timeout: Duration,
}

impl ExchangeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: String::new(),
            settlement_currency: DEFAULT_SETTLEMENT_CURRENCY.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

pub struct ExchangeRatesClient {
    http: Client,
    api_url: String,
    api_key: String,
    settlement: String,
}

impl ExchangeRatesClient {
    pub fn new(config: ExchangeConfig) -> ConversionResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            settlement: config.settlement_currency.to_uppercase(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path)
    }

    /// GET /symbols
    pub async fn supported_currencies(&self) -> ConversionResult<SupportedCurrencies> {
        let response = self
            .http
            .get(self.endpoint(SYMBOLS))
            .query(&[("access_key", self.api_key.as_str())])
            .send()
            .await?;

        decode::<SymbolsResponse>(response).await?.currencies()
    }

    /// GET /latest?base=EUR&symbols=<settlement>,<from>
    pub async fn latest_rates(&self, from: &str) -> ConversionResult<LatestRatesResponse> {
        let symbols = format!("{},{}", self.settlement, from);
        let response = self
            .http
            .get(self.endpoint(LATEST))
            .query(&[
                ("access_key", self.api_key.as_str()),
                ("base", BASE_CURRENCY),
                ("symbols", symbols.as_str()),
            ])
            .send()
            .await?;

        decode(response).await
    }
}

#[async_trait]
impl Converter for ExchangeRatesClient {
    async fn convert(&self, from: &str, amount: Decimal) -> ConversionResult<Decimal> {
        let from = from.trim().to_uppercase();

        // Hỏi lại symbols mỗi lần, không cache
        let supported = self.supported_currencies().await?;
        supported.require_all(&[self.settlement.as_str(), BASE_CURRENCY, from.as_str()])?;

        let latest = self.latest_rates(&from).await?;
        let converted = latest.amount(amount, &from, &self.settlement)?;

        debug!(%from, %amount, %converted, date = %latest.date, "converted");
        Ok(converted)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> ConversionResult<T> {
    match response.status() {
        StatusCode::OK => Ok(response.json::<T>().await?),
        StatusCode::BAD_REQUEST => {
            let body: BadRequestResponse = response.json().await?;
            Err(body.into())
        }
        status => Err(ConversionError::UnexpectedStatus(status.as_u16())),
    }
}
