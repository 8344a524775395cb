//! Currency conversion
//!
//! A process-wide cached exchange-rate table, rebased so USD = 1.0.
//! Many concurrent callers read the cache; whichever caller first
//! observes it stale refreshes it. The refresh is deliberately not
//! mutex-guarded, so brief duplicate refreshes can happen and are
//! harmless.

mod provider;

pub use provider::{FxError, HttpRateProvider, RateProvider, StaticRateProvider};

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::domain::CurrencyCode;

/// Money values are converted at 8-decimal precision
const CONVERSION_SCALE: u32 = 8;

/// Crypto tickers the upstream fiat API does not carry, expressed as
/// units per USD. Merged into every refreshed table and used alone as
/// the emergency table when no upstream fetch has ever succeeded.
fn crypto_fallback_rates() -> Vec<(&'static str, &'static str)> {
    vec![
        ("BTC", "0.0000215"),
        ("ETH", "0.00040"),
        ("USDT", "1.0"),
        ("USDC", "1.0"),
        ("BNB", "0.00320"),
        ("SOL", "0.0098"),
    ]
}

#[derive(Debug, Clone)]
struct RateTable {
    /// Units of currency per 1 USD
    rates: HashMap<String, Decimal>,
    fetched_at: DateTime<Utc>,
    /// True when built purely from the hardcoded crypto table
    emergency: bool,
}

impl RateTable {
    fn is_stale(&self, ttl: Duration) -> bool {
        let age = Utc::now() - self.fetched_at;
        age.num_seconds() >= ttl.as_secs() as i64
    }
}

/// Converts amounts between currency codes through a cached, USD-rebased
/// rate table. Cheap to clone; clones share one cache.
#[derive(Clone)]
pub struct CurrencyConverter {
    provider: Arc<dyn RateProvider>,
    cache: Arc<RwLock<Option<RateTable>>>,
    ttl: Duration,
}

impl CurrencyConverter {
    pub fn new(provider: Arc<dyn RateProvider>, ttl: Duration) -> Self {
        Self {
            provider,
            cache: Arc::new(RwLock::new(None)),
            ttl,
        }
    }

    /// Exchange rate from `from` to `to`. Returns 1 when the codes match.
    ///
    /// Refreshes the cache when older than the TTL. On upstream failure
    /// the last good table keeps serving; with no table at all, an
    /// emergency table is built from the hardcoded crypto rates.
    pub async fn get_exchange_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<Decimal, FxError> {
        if from == to {
            return Ok(Decimal::ONE);
        }

        self.ensure_fresh().await;

        let guard = self.cache.read().await;
        let table = match guard.as_ref() {
            Some(table) => table,
            None => return Err(FxError::Malformed("rate cache empty".to_string())),
        };

        let per_usd_from = table
            .rates
            .get(from.as_str())
            .ok_or_else(|| FxError::UnsupportedCurrency(from.to_string()))?;
        let per_usd_to = table
            .rates
            .get(to.as_str())
            .ok_or_else(|| FxError::UnsupportedCurrency(to.to_string()))?;

        if per_usd_from.is_zero() {
            return Err(FxError::Malformed(format!("zero rate for {}", from)));
        }

        Ok(per_usd_to / per_usd_from)
    }

    /// Convert `amount` from one currency to another at 8-decimal precision.
    pub async fn convert(
        &self,
        amount: Decimal,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<Decimal, FxError> {
        let rate = self.get_exchange_rate(from, to).await?;
        Ok((amount * rate).round_dp(CONVERSION_SCALE))
    }

    async fn ensure_fresh(&self) {
        {
            let guard = self.cache.read().await;
            if let Some(table) = guard.as_ref() {
                if !table.is_stale(self.ttl) && !table.emergency {
                    return;
                }
            }
        }

        match self.provider.fetch_rates().await {
            Ok(raw) => {
                let table = RateTable {
                    rates: rebase_to_usd(raw),
                    fetched_at: Utc::now(),
                    emergency: false,
                };
                *self.cache.write().await = Some(table);
                tracing::debug!("Exchange-rate cache refreshed");
            }
            Err(e) => {
                let mut guard = self.cache.write().await;
                match guard.as_ref() {
                    Some(_) => {
                        tracing::warn!(error = %e, "Rate refresh failed, serving last good table");
                    }
                    None => {
                        tracing::warn!(error = %e, "Rate fetch failed with empty cache, installing emergency table");
                        *guard = Some(emergency_table());
                    }
                }
            }
        }
    }
}

/// Rebase a raw table so USD = 1.0 and merge the crypto fallback for
/// tickers the upstream does not carry.
fn rebase_to_usd(raw: HashMap<String, Decimal>) -> HashMap<String, Decimal> {
    let usd = raw.get("USD").copied().unwrap_or(Decimal::ONE);

    let mut rates: HashMap<String, Decimal> = raw
        .into_iter()
        .filter(|(_, rate)| !rate.is_zero())
        .map(|(code, rate)| {
            let rebased = if usd.is_zero() { rate } else { rate / usd };
            (code.to_ascii_uppercase(), rebased)
        })
        .collect();

    rates.insert("USD".to_string(), Decimal::ONE);
    for (code, rate) in crypto_fallback_rates() {
        rates
            .entry(code.to_string())
            .or_insert_with(|| Decimal::from_str(rate).unwrap_or(Decimal::ONE));
    }
    rates
}

fn emergency_table() -> RateTable {
    let mut rates = HashMap::new();
    rates.insert("USD".to_string(), Decimal::ONE);
    for (code, rate) in crypto_fallback_rates() {
        rates.insert(
            code.to_string(),
            Decimal::from_str(rate).unwrap_or(Decimal::ONE),
        );
    }
    RateTable {
        rates,
        fetched_at: Utc::now(),
        emergency: true,
    }
}
