//! Runtime configuration: env file, tracing, ledger wiring

use anyhow::{anyhow, Context, Result};
use grossbook_business::GrossBook;
use grossbook_exchange::{Converter, ExchangeConfig, ExchangeRatesClient, FixedRateConverter};
use grossbook_persistence::SqliteLedgerStore;
use rust_decimal::Decimal;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::Cli;

/// File đọc trước khi parse arguments
pub const ENV_FILE: &str = "config.env";

/// `CODE=rate`: 1 unit of CODE costs `rate` settlement units
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedRate {
    pub currency: String,
    pub rate: Decimal,
}

pub fn parse_rate(raw: &str) -> Result<FixedRate> {
    let (currency, rate) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected CODE=RATE, got {raw:?}"))?;
    let currency = currency.trim().to_uppercase();
    if currency.is_empty() {
        return Err(anyhow!("currency code is empty in {raw:?}"));
    }
    let rate: Decimal = rate
        .trim()
        .parse()
        .with_context(|| format!("invalid rate in {raw:?}"))?;
    if rate <= Decimal::ZERO {
        return Err(anyhow!("rate for {currency} must be positive"));
    }
    Ok(FixedRate { currency, rate })
}

/// Create the directory that will hold `path`
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) => fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent)),
        None => Ok(()),
    }
}

pub fn load_env() {
    dotenvy::from_filename(ENV_FILE).ok();
}

/// Logs go to stderr (stdout carries JSON results), optionally mirrored to a file
pub fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match log_file {
        Some(path) => {
            ensure_parent_dir(path)?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {:?}", path))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

pub fn build_converter(cli: &Cli) -> Result<Arc<dyn Converter>> {
    match cli.api_key.as_deref().filter(|key| !key.is_empty()) {
        Some(api_key) => {
            let client = ExchangeRatesClient::new(ExchangeConfig {
                api_url: cli.exchange_url.clone(),
                api_key: api_key.to_string(),
                settlement_currency: cli.settlement_currency.clone(),
                timeout: cli.timeout(),
            })
            .context("Failed to create exchange client")?;
            info!(url = %cli.exchange_url, "using exchange rates api");
            Ok(Arc::new(client))
        }
        None => {
            let converter = cli
                .rates
                .iter()
                .fold(FixedRateConverter::new(&cli.settlement_currency), |c, r| {
                    c.with_rate(&r.currency, r.rate)
                });
            Ok(Arc::new(converter))
        }
    }
}

pub async fn open_ledger(cli: &Cli) -> Result<GrossBook> {
    let url = format!("sqlite:{}?mode=rwc", cli.db.display());
    let store = SqliteLedgerStore::open(&url)
        .await
        .with_context(|| format!("Failed to open database {:?}", cli.db))?;
    let converter = build_converter(cli)?;
    Ok(GrossBook::new(Arc::new(store), converter))
}
