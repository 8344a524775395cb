//! Exchange-rate providers
//!
//! Upstream sources for USD-based rate tables.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;

/// Errors from rate lookup and fetching
#[derive(Debug, thiserror::Error)]
pub enum FxError {
    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("Rate fetch failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("Malformed rate payload: {0}")]
    Malformed(String),
}

/// Source of a currency->per-USD rate table
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Fetch rates keyed by currency code. Values are units of that
    /// currency per one unit of the payload's base currency; the
    /// converter rebases so USD = 1.0.
    async fn fetch_rates(&self) -> Result<HashMap<String, Decimal>, FxError>;
}

#[derive(Debug, Deserialize)]
struct RatesPayload {
    rates: HashMap<String, Decimal>,
}

/// Fetches a JSON rate table (`{"rates": {"EUR": 0.92, ...}}`) over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRateProvider {
    client: reqwest::Client,
    url: String,
}

impl HttpRateProvider {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    async fn fetch_rates(&self) -> Result<HashMap<String, Decimal>, FxError> {
        let payload: RatesPayload = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if payload.rates.is_empty() {
            return Err(FxError::Malformed("empty rate table".to_string()));
        }
        Ok(payload.rates)
    }
}

/// A fixed rate table. Used in tests and as a wiring fallback.
#[derive(Debug, Clone, Default)]
pub struct StaticRateProvider {
    rates: HashMap<String, Decimal>,
}

impl StaticRateProvider {
    pub fn new(rates: HashMap<String, Decimal>) -> Self {
        Self { rates }
    }
}

#[async_trait]
impl RateProvider for StaticRateProvider {
    async fn fetch_rates(&self) -> Result<HashMap<String, Decimal>, FxError> {
        if self.rates.is_empty() {
            return Err(FxError::Malformed("empty rate table".to_string()));
        }
        Ok(self.rates.clone())
    }
}
